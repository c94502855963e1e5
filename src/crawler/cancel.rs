//! Cooperative cancellation
//!
//! A crawl's stop flag is a level-triggered `watch` channel: once set, every
//! race started afterwards resolves as stopped immediately, and every race
//! already waiting is woken. Racing drops the losing future, so an in-flight
//! request is abandoned at the transport layer rather than ignored.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle to a crawler's stop flag
///
/// Can be moved to other tasks or threads; [`StopHandle::stop`] only sets the
/// flag and never blocks.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests that the crawl stop; idempotent
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once a stop has been requested
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clears the flag for the next crawl
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Resolves once the flag is set
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender lives as long as self; unreachable in practice
                std::future::pending::<()>().await;
            }
        }
    }

    /// Races `operation` against the stop flag
    ///
    /// Returns `None` if the flag is, or becomes, set before `operation`
    /// completes; `operation` is dropped without being polled further. When
    /// both are ready the stop wins.
    pub async fn until_stopped<F: Future>(&self, operation: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.stopped() => None,
            output = operation => Some(output),
        }
    }
}
