//! Background flows

pub mod tail;
