//! Dynamic waiters for component and modal interactions

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type CleanupAction = Box<dyn FnOnce() + Send>;

/// Removes a waiter's custom ids from the registry; runs at most once
#[derive(Clone)]
pub struct Cleanup(Arc<Mutex<Option<CleanupAction>>>);

impl Cleanup {
    pub(crate) fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(action)))))
    }

    /// Run the cleanup; later calls are no-ops
    pub fn run(&self) {
        let action = self.0.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    pub fn has_run(&self) -> bool {
        self.0.lock().is_none()
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleanup")
            .field("has_run", &self.has_run())
            .finish()
    }
}

/// Receives every interaction matching one of the awaited custom ids
///
/// Matches keep arriving until the waiter is cleaned up, either explicitly,
/// after [`Waiter::recv_timeout`], or on drop. Interactions that arrive while
/// the previous one has not been received yet are dropped.
pub struct Waiter<T> {
    receiver: mpsc::Receiver<T>,
    cleanup: Cleanup,
}

impl<T> Waiter<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<T>, cleanup: Cleanup) -> Self {
        Self { receiver, cleanup }
    }

    /// Next matching interaction; `None` once cleaned up and drained
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Wait for one match, then clean up whether or not it arrived
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<T> {
        let received = tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .flatten();
        self.cleanup();
        received
    }

    /// Handle that can clean up from elsewhere, e.g. a timer task
    pub fn cleanup_handle(&self) -> Cleanup {
        self.cleanup.clone()
    }

    pub fn cleanup(&mut self) {
        self.cleanup.run();
        self.receiver.close();
    }
}

impl<T> Drop for Waiter<T> {
    fn drop(&mut self) {
        self.cleanup.run();
    }
}

impl<T> std::fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}
