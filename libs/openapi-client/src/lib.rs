//! Wire models for the SQD cloud API

pub mod models;
