//! HTTP boundary to the SQD cloud API

pub mod client;
pub mod deployments;
pub mod logs;
