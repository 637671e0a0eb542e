//! Deployment tracking

pub mod abort;
pub mod cursor;
pub mod format;
pub mod tracker;
