//! Mutation coordinator
//!
//! `Journal` is the only way in to journal data. Each mutation takes the
//! mutex for the collection it touches, calls the storage adapter and then
//! updates the view state of that collection:
//!
//! | operation              | mutexes (in order)                      |
//! |------------------------|-----------------------------------------|
//! | save/update dream      | `entry-save`                            |
//! | save/update goal       | `goal-save`                             |
//! | save voice note        | `voice-note-save`                       |
//! | update voice note      | `voice-operations`, `voice-note-save`   |
//! | confirmed delete       | `delete-operations`, kind's save mutex  |
//! | display refresh        | `entry-display`                         |
//!
//! Deletes are two-phase: `delete_*` arms a countdown, `confirm_delete`
//! performs it, and an expired countdown drops the request.
//!
//! ## Usage
//!
//! ```ignore
//! let journal = Journal::open(Config::load()?).await;
//!
//! let dream = journal.save_dream(DreamDraft::new("Flying over the sea")).await?;
//! let page = journal.display_dreams(&ViewQuery::all()).await;
//!
//! journal.delete_dream(dream.id).await?;
//! journal.confirm_delete(dream.id).await?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::delete::{DeleteState, PendingDelete, PendingDeletes};
use crate::error::{JournalError, JournalResult};
use crate::models::{
    Dream, DreamDraft, Goal, GoalDraft, Record, RecordId, RecordKind, VoiceNote, VoiceNoteDraft,
};
use crate::mutex::{MutexName, MutexRegistry};
use crate::storage::{FlatStore, JsonFileStore, PrimaryStore, SqliteStore, StorageAdapter, Tier};
use crate::view::{ListenerChange, PaginationMode, ScrollPosition, ViewController, ViewQuery, ViewWindow};

/// Records to render plus the window they were cut from
#[derive(Debug, Clone, Serialize)]
pub struct DisplayPage<R> {
    pub records: Vec<R>,
    pub window: ViewWindow,
}

/// Size and serving tier of one collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub kind: RecordKind,
    pub count: usize,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalStats {
    pub persistent: bool,
    pub collections: Vec<CollectionStats>,
}

impl JournalStats {
    pub fn count(&self, kind: RecordKind) -> usize {
        self.collections
            .iter()
            .find(|c| c.kind == kind)
            .map_or(0, |c| c.count)
    }
}

/// Dream journal: guarded mutations, loads and view state
pub struct Journal {
    config: Config,
    mutexes: Arc<MutexRegistry>,
    storage: StorageAdapter,
    deletes: PendingDeletes,
    views: Mutex<HashMap<RecordKind, ViewController>>,
}

impl Journal {
    /// Open the journal on the configured data directory
    ///
    /// A database that cannot be opened is logged and skipped; the journal
    /// then runs on the flat store alone.
    pub async fn open(config: Config) -> Self {
        let primary: Option<Box<dyn PrimaryStore>> = match SqliteStore::open(&config.sqlite_path()) {
            Ok(store) => Some(Box::new(store)),
            Err(e) => {
                warn!(path = ?config.sqlite_path(), error = %e, "primary store unavailable");
                None
            }
        };
        let secondary: Option<Box<dyn FlatStore>> =
            Some(Box::new(JsonFileStore::new(config.flat_store_dir())));

        Self::with_backends(config, primary, secondary).await
    }

    /// Open the journal on explicit backends
    ///
    /// Records stranded in the secondary store by an earlier outage are
    /// moved back into the primary.
    pub async fn with_backends(
        config: Config,
        primary: Option<Box<dyn PrimaryStore>>,
        secondary: Option<Box<dyn FlatStore>>,
    ) -> Self {
        let journal = Self::with_storage(
            config,
            StorageAdapter::new(primary, secondary),
            Arc::new(MutexRegistry::new()),
        );
        journal.reconcile().await;
        info!(persistent = journal.storage.is_persistent(), "journal opened");
        journal
    }

    /// Assemble a journal from parts, sharing an existing mutex registry
    pub fn with_storage(config: Config, storage: StorageAdapter, mutexes: Arc<MutexRegistry>) -> Self {
        let views = RecordKind::ALL
            .into_iter()
            .map(|kind| {
                let view = ViewController::new(config.items_per_page, config.endless_increment);
                (kind, view)
            })
            .collect();

        Self {
            deletes: PendingDeletes::new(config.delete_timeout()),
            config,
            mutexes,
            storage,
            views: Mutex::new(views),
        }
    }

    async fn reconcile(&self) {
        let results = [
            (RecordKind::Dream, self.storage.reconcile::<Dream>().await),
            (RecordKind::Goal, self.storage.reconcile::<Goal>().await),
            (RecordKind::VoiceNote, self.storage.reconcile::<VoiceNote>().await),
        ];
        for (kind, result) in results {
            if let Err(e) = result {
                warn!(%kind, error = %e, "could not reconcile flat store");
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mutexes(&self) -> &Arc<MutexRegistry> {
        &self.mutexes
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_persistent()
    }

    // ==================== Dream Operations ====================

    pub async fn save_dream(&self, draft: DreamDraft) -> JournalResult<Dream> {
        let dream = draft.into_dream()?;
        self.save(dream).await
    }

    pub async fn update_dream(&self, dream: &Dream) -> JournalResult<()> {
        dream.validate()?;
        self.update(dream).await
    }

    /// Arm the two-phase delete of a dream
    pub async fn delete_dream(&self, id: RecordId) -> JournalResult<PendingDelete> {
        self.arm_delete::<Dream>(id).await
    }

    pub async fn load_dreams(&self) -> Vec<Dream> {
        self.storage.load_records().await
    }

    pub async fn get_dream(&self, id: RecordId) -> JournalResult<Option<Dream>> {
        self.get(id).await
    }

    pub async fn display_dreams(&self, query: &ViewQuery<Dream>) -> DisplayPage<Dream> {
        self.display(query).await
    }

    // ==================== Goal Operations ====================

    pub async fn save_goal(&self, draft: GoalDraft) -> JournalResult<Goal> {
        let goal = draft.into_goal()?;
        self.save(goal).await
    }

    pub async fn update_goal(&self, goal: &Goal) -> JournalResult<()> {
        goal.validate()?;
        self.update(goal).await
    }

    /// Arm the two-phase delete of a goal
    pub async fn delete_goal(&self, id: RecordId) -> JournalResult<PendingDelete> {
        self.arm_delete::<Goal>(id).await
    }

    pub async fn load_goals(&self) -> Vec<Goal> {
        self.storage.load_records().await
    }

    pub async fn get_goal(&self, id: RecordId) -> JournalResult<Option<Goal>> {
        self.get(id).await
    }

    pub async fn display_goals(&self, query: &ViewQuery<Goal>) -> DisplayPage<Goal> {
        self.display(query).await
    }

    // ==================== Voice Note Operations ====================

    pub async fn save_voice_note(&self, draft: VoiceNoteDraft) -> JournalResult<VoiceNote> {
        let note = draft.into_voice_note()?;
        self.save(note).await
    }

    /// Update a voice note under `voice-operations`, then `voice-note-save`
    pub async fn update_voice_note(&self, note: &VoiceNote) -> JournalResult<()> {
        note.validate()?;

        self.mutexes
            .with_mutex(MutexName::VoiceOperations, || {
                self.mutexes
                    .with_mutex(MutexName::VoiceNoteSave, || self.storage.update_record(note))
            })
            .await?;

        debug!(id = %note.id, "voice note updated");
        self.invalidate(RecordKind::VoiceNote);
        Ok(())
    }

    /// Arm the two-phase delete of a voice note
    pub async fn delete_voice_note(&self, id: RecordId) -> JournalResult<PendingDelete> {
        self.arm_delete::<VoiceNote>(id).await
    }

    pub async fn load_voice_notes(&self) -> Vec<VoiceNote> {
        self.storage.load_records().await
    }

    pub async fn get_voice_note(&self, id: RecordId) -> JournalResult<Option<VoiceNote>> {
        self.get(id).await
    }

    pub async fn display_voice_notes(&self, query: &ViewQuery<VoiceNote>) -> DisplayPage<VoiceNote> {
        self.display(query).await
    }

    // ==================== Two-phase Delete ====================

    /// Perform a pending delete, returning whether a record was removed
    ///
    /// Fails with [`JournalError::DeleteNotPending`] when no countdown is
    /// running for `id`. The state reads `Confirming` until storage answers.
    /// A storage failure cancels the delete.
    pub async fn confirm_delete(&self, id: RecordId) -> JournalResult<bool> {
        let pending = self
            .deletes
            .begin_confirm(id)
            .ok_or(JournalError::DeleteNotPending(id))?;
        let kind = pending.kind;

        let result = self
            .mutexes
            .with_mutex(MutexName::DeleteOperations, || {
                self.mutexes
                    .with_mutex(kind.save_mutex(), || self.storage.delete_record(kind, id))
            })
            .await;

        match result {
            Ok(removed) => {
                self.deletes.settle(id, DeleteState::Confirmed);
                self.view(kind, ViewController::reset);
                info!(%kind, %id, removed, "delete confirmed");
                Ok(removed)
            }
            Err(e) => {
                self.deletes.settle(id, DeleteState::Cancelled);
                warn!(%kind, %id, error = %e, "delete failed");
                Err(e.into())
            }
        }
    }

    /// Drop a pending delete; returns whether one was pending
    pub fn cancel_delete(&self, id: RecordId) -> bool {
        let cancelled = self.deletes.cancel(id);
        if cancelled {
            debug!(%id, "delete cancelled");
        }
        cancelled
    }

    pub fn delete_state(&self, id: RecordId) -> DeleteState {
        self.deletes.state(id)
    }

    // ==================== View State ====================

    /// Jump to a page of `kind`'s view; returns the page now current
    pub fn go_to_page(&self, kind: RecordKind, page: usize) -> usize {
        self.view(kind, |view| view.go_to_page(page))
    }

    pub fn set_pagination_mode(&self, kind: RecordKind, mode: PaginationMode) -> ListenerChange {
        self.view(kind, |view| view.set_mode(mode))
    }

    /// Grow an endless view by one increment; false when nothing was loaded
    pub fn load_more(&self, kind: RecordKind) -> bool {
        self.view(kind, |view| {
            if !view.request_more() {
                return false;
            }
            view.complete_load();
            true
        })
    }

    /// Forward a scroll event; true when a load was started
    ///
    /// Finish the load with [`complete_load`](Self::complete_load) once the
    /// new records are rendered.
    pub fn on_scroll(&self, kind: RecordKind, position: ScrollPosition) -> bool {
        self.view(kind, |view| view.on_scroll(position))
    }

    pub fn complete_load(&self, kind: RecordKind) -> usize {
        self.view(kind, ViewController::complete_load)
    }

    /// Snapshot of `kind`'s view state
    pub fn view_state(&self, kind: RecordKind) -> ViewController {
        self.view(kind, |view| view.clone())
    }

    /// Debouncer for search input, using the configured quiet period
    pub fn search_debouncer(&self) -> Debouncer {
        Debouncer::new(self.config.search_debounce())
    }

    pub async fn stats(&self) -> JournalStats {
        let counts = [
            (RecordKind::Dream, self.load_dreams().await.len()),
            (RecordKind::Goal, self.load_goals().await.len()),
            (RecordKind::VoiceNote, self.load_voice_notes().await.len()),
        ];

        JournalStats {
            persistent: self.storage.is_persistent(),
            collections: counts
                .into_iter()
                .map(|(kind, count)| CollectionStats {
                    kind,
                    count,
                    tier: self.storage.active_tier(kind),
                })
                .collect(),
        }
    }

    // ==================== Internals ====================

    async fn save<R: Record>(&self, record: R) -> JournalResult<R> {
        let tier = self
            .mutexes
            .with_mutex(R::KIND.save_mutex(), || self.storage.add_record(&record))
            .await?;

        debug!(kind = %R::KIND, id = %record.id(), %tier, "record saved");
        self.invalidate(R::KIND);
        Ok(record)
    }

    async fn update<R: Record>(&self, record: &R) -> JournalResult<()> {
        let tier = self
            .mutexes
            .with_mutex(R::KIND.save_mutex(), || self.storage.update_record(record))
            .await?;

        debug!(kind = %R::KIND, id = %record.id(), %tier, "record updated");
        self.invalidate(R::KIND);
        Ok(())
    }

    async fn get<R: Record>(&self, id: RecordId) -> JournalResult<Option<R>> {
        Ok(self.storage.get_record(id).await?)
    }

    async fn arm_delete<R: Record>(&self, id: RecordId) -> JournalResult<PendingDelete> {
        if self.storage.get_record::<R>(id).await?.is_none() {
            return Err(JournalError::NotFound { kind: R::KIND, id });
        }
        self.deletes
            .arm(R::KIND, id)
            .ok_or(JournalError::DeleteInFlight(id))
    }

    /// Load, filter and paginate `R` under `entry-display`
    async fn display<R: Record>(&self, query: &ViewQuery<R>) -> DisplayPage<R> {
        self.mutexes
            .with_mutex(MutexName::EntryDisplay, || async move {
                let filtered = query.apply(self.storage.load_records::<R>().await);
                let window = self.view(R::KIND, |view| {
                    view.set_criteria(query.key());
                    view.recompute(filtered.len())
                });
                DisplayPage {
                    records: window.slice(&filtered).to_vec(),
                    window,
                }
            })
            .await
    }

    fn invalidate(&self, kind: RecordKind) {
        self.view(kind, ViewController::invalidate);
    }

    fn view<T>(&self, kind: RecordKind, f: impl FnOnce(&mut ViewController) -> T) -> T {
        let mut views = self.views();
        let view = views
            .entry(kind)
            .or_insert_with(|| ViewController::new(self.config.items_per_page, self.config.endless_increment));
        f(view)
    }

    fn views(&self) -> MutexGuard<'_, HashMap<RecordKind, ViewController>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
