//! Cancellable delayed-task scheduling for debounced persistence.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Schedules a single delayed action; re-arming cancels the previous one.
///
/// A burst of N `arm` calls inside the delay window therefore runs the
/// action exactly once.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer with the given delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            task: Mutex::new(None),
        }
    }

    /// Schedule `action` to run after the delay, cancelling any
    /// previously armed action.
    pub fn arm<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut slot = self.task.lock();

        if let Some(previous) = slot.take() {
            previous.abort();
        }

        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Cancel any pending action.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// The configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
