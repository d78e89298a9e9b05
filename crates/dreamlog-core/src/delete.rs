//! Two-phase delete
//!
//! Asking to delete a record only arms a countdown. The record is removed
//! when the delete is confirmed before the countdown ends; otherwise the
//! countdown expires and the request is dropped.
//!
//! Each record id has its own state machine:
//!
//! ```text
//! None -> Pending { expires_at } -> Confirming -> Confirmed
//!                                              -> Cancelled (storage failed)
//!                                -> Cancelled (expired or cancelled)
//! ```
//!
//! Arming an id that is already pending replaces its countdown, so at most
//! one countdown per id is ever live. An id that is being confirmed cannot
//! be armed again until it settles. Settled states are kept for
//! [`SETTLED_RETENTION`] and then read as `None` again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{RecordId, RecordKind};

/// How long a confirmed or cancelled outcome stays observable
pub const SETTLED_RETENTION: Duration = Duration::from_secs(600);

/// Observable delete state of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    None,
    Pending { expires_at: Instant },
    /// Confirmed by the caller and waiting on storage
    Confirming,
    Confirmed,
    Cancelled,
}

/// An armed delete, as handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelete {
    pub kind: RecordKind,
    pub id: RecordId,
    pub expires_at: Instant,
}

struct Countdown {
    kind: RecordKind,
    expires_at: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

struct Settled {
    state: DeleteState,
    at: Instant,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<RecordId, Countdown>,
    confirming: HashSet<RecordId>,
    settled: HashMap<RecordId, Settled>,
    generation: u64,
}

impl Inner {
    fn settle(&mut self, id: RecordId, state: DeleteState) {
        let now = Instant::now();
        self.prune(now);
        if let Some(countdown) = self.pending.remove(&id) {
            countdown.timer.abort();
        }
        self.confirming.remove(&id);
        self.settled.insert(id, Settled { state, at: now });
    }

    fn prune(&mut self, now: Instant) {
        self.settled
            .retain(|_, settled| now.duration_since(settled.at) < SETTLED_RETENTION);
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-record delete countdowns
pub struct PendingDeletes {
    timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl PendingDeletes {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the countdown for `id`
    ///
    /// Returns `None` while a confirmed delete of `id` is still running.
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, kind: RecordKind, id: RecordId) -> Option<PendingDelete> {
        let mut inner = lock(&self.inner);
        if inner.confirming.contains(&id) {
            debug!(%id, "delete already being confirmed");
            return None;
        }

        if let Some(previous) = inner.pending.remove(&id) {
            previous.timer.abort();
            debug!(%id, "replacing pending delete");
        }
        inner.settled.remove(&id);
        let now = Instant::now();
        inner.prune(now);

        inner.generation += 1;
        let generation = inner.generation;
        let expires_at = now + self.timeout;
        let timer = tokio::spawn(expire(Arc::clone(&self.inner), id, generation, expires_at));

        inner.pending.insert(
            id,
            Countdown {
                kind,
                expires_at,
                generation,
                timer,
            },
        );
        debug!(%kind, %id, timeout_ms = self.timeout.as_millis() as u64, "delete armed");

        Some(PendingDelete {
            kind,
            id,
            expires_at,
        })
    }

    /// Stop the countdown for `id` and mark it as being confirmed
    ///
    /// The caller reports the outcome with [`settle`](Self::settle).
    pub fn begin_confirm(&self, id: RecordId) -> Option<PendingDelete> {
        let mut inner = lock(&self.inner);
        let countdown = inner.pending.remove(&id)?;
        countdown.timer.abort();
        inner.confirming.insert(id);
        Some(PendingDelete {
            kind: countdown.kind,
            id,
            expires_at: countdown.expires_at,
        })
    }

    /// Record the final state of `id`, dropping any countdown it still has
    pub fn settle(&self, id: RecordId, state: DeleteState) {
        lock(&self.inner).settle(id, state);
    }

    /// Cancel a pending delete, returning whether one was pending
    pub fn cancel(&self, id: RecordId) -> bool {
        let mut inner = lock(&self.inner);
        if !inner.pending.contains_key(&id) {
            return false;
        }
        inner.settle(id, DeleteState::Cancelled);
        true
    }

    pub fn state(&self, id: RecordId) -> DeleteState {
        let inner = lock(&self.inner);
        if let Some(countdown) = inner.pending.get(&id) {
            return DeleteState::Pending {
                expires_at: countdown.expires_at,
            };
        }
        if inner.confirming.contains(&id) {
            return DeleteState::Confirming;
        }
        match inner.settled.get(&id) {
            Some(settled) if settled.at.elapsed() < SETTLED_RETENTION => settled.state,
            _ => DeleteState::None,
        }
    }

    /// Number of live countdowns
    pub fn pending_count(&self) -> usize {
        lock(&self.inner).pending.len()
    }
}

impl Drop for PendingDeletes {
    fn drop(&mut self) {
        for (_, countdown) in lock(&self.inner).pending.drain() {
            countdown.timer.abort();
        }
    }
}

async fn expire(inner: Arc<Mutex<Inner>>, id: RecordId, generation: u64, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;

    let mut inner = lock(&inner);
    let current = inner
        .pending
        .get(&id)
        .is_some_and(|countdown| countdown.generation == generation);
    if current {
        // Removed first so settle does not abort the task running this
        inner.pending.remove(&id);
        inner.settle(id, DeleteState::Cancelled);
        debug!(%id, "pending delete expired");
    }
}
