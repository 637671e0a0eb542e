//! One-way cancellation shared between a caller and its background flows

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation token with two states, active and aborted
///
/// Clones share the same state. Once aborted it stays aborted.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Abort every flow holding a clone of this handle
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the handle is aborted
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on abort
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}
