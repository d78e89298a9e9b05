//! Named mutex registry
//!
//! A fixed set of logical locks, one per mutually-exclusive resource class.
//! [`MutexRegistry::with_mutex`] runs an async operation while holding the
//! named lock. Callers that find the lock taken join a FIFO queue and are
//! woken one at a time as each holder finishes.
//!
//! ## Handoff
//!
//! Releasing a lock with waiters queued does not unlock it: ownership is
//! passed straight to the oldest live waiter by completing its oneshot
//! channel. The waiter resumes as its own task continuation, so draining a
//! long queue never grows the call stack.
//!
//! Release happens in a guard's `Drop`. An operation that errors, panics or
//! is cancelled still frees the lock for the next caller.
//!
//! Locks are not re-entrant. Calling `with_mutex` for a name from inside an
//! operation already holding that name queues behind itself forever.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// The resource classes guarded by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutexName {
    EntryDisplay,
    EntrySave,
    GoalSave,
    VoiceNoteSave,
    VoiceOperations,
    DeleteOperations,
}

impl MutexName {
    pub const ALL: [MutexName; 6] = [
        MutexName::EntryDisplay,
        MutexName::EntrySave,
        MutexName::GoalSave,
        MutexName::VoiceNoteSave,
        MutexName::VoiceOperations,
        MutexName::DeleteOperations,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutexName::EntryDisplay => "entry-display",
            MutexName::EntrySave => "entry-save",
            MutexName::GoalSave => "goal-save",
            MutexName::VoiceNoteSave => "voice-note-save",
            MutexName::VoiceOperations => "voice-operations",
            MutexName::DeleteOperations => "delete-operations",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MutexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutex name outside the fixed registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mutex '{0}'")]
pub struct UnknownMutex(pub String);

impl FromStr for MutexName {
    type Err = UnknownMutex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MutexName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownMutex(s.to_string()))
    }
}

/// Snapshot of one lock, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexStatus {
    pub locked: bool,
    /// Waiters still interested in the lock
    pub queued: usize,
}

#[derive(Default)]
struct LockState {
    locked: bool,
    queue: VecDeque<oneshot::Sender<()>>,
}

struct Slot {
    name: MutexName,
    state: Mutex<LockState>,
}

impl Slot {
    fn new(name: MutexName) -> Self {
        Self {
            name,
            state: Mutex::new(LockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand the lock to the oldest live waiter, or unlock if there is none
    fn release(&self) {
        let mut state = self.state();
        while let Some(waiter) = state.queue.pop_front() {
            if waiter.send(()).is_ok() {
                debug!(mutex = %self.name, remaining = state.queue.len(), "lock handed off");
                return;
            }
        }
        state.locked = false;
    }
}

/// Owns a slot's lock until dropped
struct SlotGuard {
    slot: Arc<Slot>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slot.release();
    }
}

/// A queued caller
///
/// Dropping a waiter that was granted the lock but never resumed passes the
/// lock on instead of stranding it.
struct Waiter {
    slot: Arc<Slot>,
    rx: Option<oneshot::Receiver<()>>,
}

impl Waiter {
    async fn granted(mut self) -> SlotGuard {
        if let Some(rx) = self.rx.as_mut() {
            // The sender is only dropped after a successful send.
            let _ = rx.await;
        }
        self.rx = None;
        SlotGuard {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.slot.release();
            }
        }
    }
}

async fn acquire(slot: Arc<Slot>) -> SlotGuard {
    let rx = {
        let mut state = slot.state();
        if !state.locked {
            state.locked = true;
            drop(state);
            return SlotGuard { slot };
        }
        let (tx, rx) = oneshot::channel();
        state.queue.push_back(tx);
        debug!(mutex = %slot.name, position = state.queue.len(), "waiting for lock");
        rx
    };

    Waiter { slot, rx: Some(rx) }.granted().await
}

/// Process-wide set of named locks
///
/// Construct once at startup and share it (usually behind an `Arc`) with
/// every component that mutates journal collections.
pub struct MutexRegistry {
    slots: [Arc<Slot>; 6],
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self {
            slots: MutexName::ALL.map(|name| Arc::new(Slot::new(name))),
        }
    }

    /// Run `operation` while holding the lock for `name`
    ///
    /// Operations on the same name run one at a time in submission order.
    /// Operations on different names are independent.
    pub async fn with_mutex<F, Fut, T>(&self, name: MutexName, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = acquire(Arc::clone(&self.slots[name.index()])).await;
        operation().await
    }

    /// Like [`with_mutex`](Self::with_mutex), addressed by string name
    ///
    /// An unknown name is a programming error; it is logged and the
    /// operation runs unguarded rather than being dropped.
    pub async fn with_named_mutex<F, Fut, T>(&self, name: &str, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match name.parse::<MutexName>() {
            Ok(name) => self.with_mutex(name, operation).await,
            Err(err) => {
                warn!("{}; running operation unguarded", err);
                operation().await
            }
        }
    }

    pub fn status(&self, name: MutexName) -> MutexStatus {
        let state = self.slots[name.index()].state();
        MutexStatus {
            locked: state.locked,
            queued: state.queue.iter().filter(|tx| !tx.is_closed()).count(),
        }
    }
}

impl Default for MutexRegistry {
    fn default() -> Self {
        Self::new()
    }
}
