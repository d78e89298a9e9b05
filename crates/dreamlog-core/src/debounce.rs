//! Cancel-and-restart timer for search and filter input

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Quiet period before a debounced call runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs only the last task of a burst, once input has been quiet for the
/// configured period
///
/// A task that has started its work is never interrupted. Newer calls only
/// drop tasks still waiting out the quiet period.
pub struct Debouncer {
    quiet: Duration,
    pending: Mutex<Option<Scheduled>>,
}

struct Scheduled {
    handle: JoinHandle<()>,
    /// Set by whichever side gets there first: the task when it starts, or
    /// a later call or cancel withdrawing it
    claimed: Arc<AtomicBool>,
}

impl Scheduled {
    /// Stop the task if it is still waiting; a started task runs on
    fn withdraw(self) {
        if !self.claimed.swap(true, Ordering::AcqRel) {
            self.handle.abort();
        }
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule `task`, dropping whatever was scheduled before
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let quiet = self.quiet;
        let claimed = Arc::new(AtomicBool::new(false));
        let claim = Arc::clone(&claimed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if claim.swap(true, Ordering::AcqRel) {
                return;
            }
            task.await;
        });

        let previous = self.pending().replace(Scheduled { handle, claimed });
        if let Some(previous) = previous {
            previous.withdraw();
        }
    }

    /// Drop the scheduled task if it has not started yet
    pub fn cancel(&self) {
        let scheduled = self.pending().take();
        if let Some(scheduled) = scheduled {
            scheduled.withdraw();
        }
    }

    /// Whether the latest task is waiting or running
    pub fn is_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|scheduled| !scheduled.handle.is_finished())
    }

    fn pending(&self) -> MutexGuard<'_, Option<Scheduled>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
