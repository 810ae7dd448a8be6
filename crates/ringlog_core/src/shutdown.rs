//! Process-wide shutdown flag.

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable shutdown flag.
///
/// Every clone observes the same flag. Once triggered it stays triggered.
/// Tasks either poll [`is_triggered`](Self::is_triggered) or race
/// [`wait`](Self::wait) against their own suspension points.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    /// Creates an untriggered flag.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when shutdown is triggered, immediately if it already was.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of `self`, so this only
        // returns once the flag is set.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
