//! ChangeFeed - version counter and long-poll wakeups
//!
//! Readers remember the last version they saw and call [`ChangeFeed::wait`]
//! with it. Every successful mutation calls [`ChangeFeed::bump`], which
//! releases all waiters at once. The feed has its own synchronization and
//! never touches the store's mutation lock.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// Answer to a long-poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOutcome {
    pub version: u64,
    pub changed: bool,
}

/// Monotonic change counter shared by the store and its long-poll readers
#[derive(Debug)]
pub struct ChangeFeed {
    version_tx: watch::Sender<u64>,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Create a feed at version 0
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            version_tx,
            shutdown_tx,
        }
    }

    pub fn current(&self) -> u64 {
        *self.version_tx.borrow()
    }

    /// Advance the version by one and wake every waiter. Never blocks.
    pub fn bump(&self) -> u64 {
        let mut next = 0;
        self.version_tx.send_modify(|version| {
            *version += 1;
            next = *version;
        });
        tracing::debug!("Change version now {}", next);
        next
    }

    /// Release all waiters with `changed = false`; later waits return at once
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Wait until the version differs from `since`, or `timeout` elapses.
    ///
    /// A `since` that differs from the current version in either direction
    /// (a client that outlived a restart can be ahead) returns immediately.
    pub async fn wait(&self, since: u64, timeout: Duration) -> WaitOutcome {
        let mut version_rx = self.version_tx.subscribe();
        let current = *version_rx.borrow_and_update();
        if since != current {
            return WaitOutcome {
                version: current,
                changed: true,
            };
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow_and_update() {
            return WaitOutcome {
                version: current,
                changed: false,
            };
        }

        let outcome = tokio::select! {
            result = version_rx.changed() => match result {
                Ok(()) => WaitOutcome {
                    version: *version_rx.borrow_and_update(),
                    changed: true,
                },
                Err(_) => WaitOutcome { version: current, changed: false },
            },
            _ = tokio::time::sleep(timeout) => WaitOutcome {
                version: current,
                changed: false,
            },
            // Only ever flips to true
            _ = shutdown_rx.changed() => WaitOutcome {
                version: self.current(),
                changed: false,
            },
        };

        tracing::debug!(
            "Long poll since {} finished: version {}, changed {}",
            since,
            outcome.version,
            outcome.changed
        );
        outcome
    }
}
