//! Incremental rendering of a deployment's cumulative log

use openapi_client::models::DeployLog;

/// Number of deployment log entries already rendered by one poll session
///
/// The server only ever appends to a deployment's log, so a single position
/// is enough to know what is new. The cursor never moves backwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogCursor {
    seen: usize,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.seen
    }

    /// Entries appended since the last call, in order
    ///
    /// Entries with an empty message are skipped but still count as seen.
    pub fn take_new<'a>(&mut self, logs: &'a [DeployLog]) -> Vec<&'a DeployLog> {
        let Some(fresh) = logs.get(self.seen..) else {
            return Vec::new();
        };
        self.seen += fresh.len();
        fresh.iter().filter(|log| !log.message.is_empty()).collect()
    }
}
