//! Trigger coalescing
//!
//! A [`Debouncer`] turns a burst of refresh triggers into a single run. The
//! first trigger schedules the action after the delay; triggers arriving
//! while that run is pending are absorbed.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Delay applied by [`Debouncer::default`]
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(125);

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `action` unless a run is already pending
    ///
    /// Returns `true` when this trigger scheduled the run. Must be called
    /// from within a tokio runtime.
    pub fn trigger<F, Fut>(&self, action: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("trigger absorbed by pending run");
            return false;
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::Release);
            action().await;
        });

        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drops a pending run without executing it
    pub fn cancel(&self) {
        if let Some(task) = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take() {
            if self.pending.swap(false, Ordering::AcqRel) {
                task.abort();
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
