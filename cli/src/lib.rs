//! sqdctl library
//!
//! Deployment tracking and live log tailing for squids running on the SQD
//! cloud.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
pub mod workers;
