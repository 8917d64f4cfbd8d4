//! Set-once completion signal with a bounded wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// A manual-reset style event that can only be set once.
///
/// Setting it after every waiter has given up is harmless, and a second
/// `set` is a no-op rather than an error.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Sets the signal. Returns `true` only for the call that set it.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                false
            } else {
                *set = true;
                true
            }
        })
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was observed.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let observed = async move {
            loop {
                if *rx.borrow_and_update() {
                    return true;
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        };

        tokio::time::timeout(timeout, observed)
            .await
            .unwrap_or(false)
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
