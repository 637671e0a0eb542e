//! Command orchestration

pub mod command;
pub mod console;
pub mod options;
pub mod run;
