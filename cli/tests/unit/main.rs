//! Integration tests for deployment tracking and live log tailing

mod test_tail;
mod test_tracker;
