//! Tiered storage adapter
//!
//! Every write first goes to the primary store. When the primary is missing
//! or fails, the adapter loads the kind's whole collection from the flat
//! store, applies the mutation in memory (prepend for add, replace in place
//! for update, filter out for delete) and rewrites the collection. Loads
//! prefer primary, then secondary, then the in-memory copy.
//!
//! A write that lands in the flat store while a primary is configured marks
//! the kind as stranded. The next request for that kind that finds the
//! primary reachable merges the flat records into it before going on, so
//! records written during an outage stay visible once the primary is back.
//!
//! The load-modify-save path is not atomic. Callers must serialize writes to
//! a kind through its mutex (see [`crate::Journal`]).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{Record, RecordId, RecordKind};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{FlatStore, PrimaryStore};

/// Which backend served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
    Memory,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Primary => "primary",
            Tier::Secondary => "secondary",
            Tier::Memory => "memory",
        };
        f.write_str(name)
    }
}

enum Mutation<'a> {
    Add(RecordId, &'a Value),
    Update(RecordId, &'a Value),
    Delete(RecordId),
}

/// Storage front end with automatic tier fallback
pub struct StorageAdapter {
    primary: Option<Box<dyn PrimaryStore>>,
    secondary: Option<Box<dyn FlatStore>>,
    memory: Mutex<HashMap<RecordKind, Vec<Value>>>,
    active: Mutex<HashMap<RecordKind, Tier>>,
    /// Kinds whose flat store may hold records the primary lacks
    stranded: Mutex<HashSet<RecordKind>>,
}

impl StorageAdapter {
    pub fn new(
        primary: Option<Box<dyn PrimaryStore>>,
        secondary: Option<Box<dyn FlatStore>>,
    ) -> Self {
        // Leftovers from an earlier session are unknown until checked
        let stranded = match (&primary, &secondary) {
            (Some(_), Some(_)) => RecordKind::ALL.into_iter().collect(),
            _ => HashSet::new(),
        };
        Self {
            primary,
            secondary,
            memory: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            stranded: Mutex::new(stranded),
        }
    }

    /// Adapter with no persistent tier; writes live only in memory
    pub fn in_memory() -> Self {
        Self::new(None, None)
    }

    /// Whether any persistent tier is configured
    pub fn is_persistent(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Tier that served the last request for `kind`
    pub fn active_tier(&self, kind: RecordKind) -> Option<Tier> {
        lock(&self.active).get(&kind).copied()
    }

    /// Load the full collection of `R`
    ///
    /// Never fails: when no persistent tier answers, the last known
    /// in-memory collection is returned. Unreadable entries are skipped.
    pub async fn load_records<R: Record>(&self) -> Vec<R> {
        tokio::task::yield_now().await;

        let (values, _) = self.load_values(R::KIND);
        decode_all(R::KIND, values)
    }

    /// Look up a single record by id
    pub async fn get_record<R: Record>(&self, id: RecordId) -> StorageResult<Option<R>> {
        tokio::task::yield_now().await;

        self.recover(R::KIND);
        if let Some(primary) = &self.primary {
            match primary.get(R::KIND, id) {
                Ok(Some(value)) => return Ok(Some(serde_json::from_value(value)?)),
                Ok(None) => return Ok(None),
                Err(e) => warn!(kind = %R::KIND, error = %e, "primary lookup failed, falling back"),
            }
        }

        let (values, _) = self.load_values(R::KIND);
        match values.into_iter().find(|v| value_id(v) == Some(id)) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Store a new record
    pub async fn add_record<R: Record>(&self, record: &R) -> StorageResult<Tier> {
        tokio::task::yield_now().await;

        let value = serde_json::to_value(record)?;
        let (tier, _) = self.write(R::KIND, Mutation::Add(record.id(), &value))?;
        Ok(tier)
    }

    /// Replace the stored record with the same id
    pub async fn update_record<R: Record>(&self, record: &R) -> StorageResult<Tier> {
        tokio::task::yield_now().await;

        let value = serde_json::to_value(record)?;
        let (tier, _) = self.write(R::KIND, Mutation::Update(record.id(), &value))?;
        Ok(tier)
    }

    /// Remove a record, returning whether one was removed
    pub async fn delete_record(&self, kind: RecordKind, id: RecordId) -> StorageResult<bool> {
        tokio::task::yield_now().await;

        let (_, removed) = self.write(kind, Mutation::Delete(id))?;
        Ok(removed)
    }

    /// Move records stranded in the flat store back into the primary
    ///
    /// Records absent from the primary are inserted; records whose flat copy
    /// is newer replace the primary copy. The flat list is then cleared,
    /// keeping only entries that do not decode as `R`. Returns how many
    /// records were written to the primary.
    pub async fn reconcile<R: Record>(&self) -> StorageResult<usize> {
        tokio::task::yield_now().await;

        let mut stranded = lock(&self.stranded);
        let merged = self.merge_stranded(R::KIND, |value| {
            serde_json::from_value::<R>(value.clone()).is_ok()
        })?;
        stranded.remove(&R::KIND);
        Ok(merged)
    }

    /// Whether the flat store may hold records the primary has not seen
    pub fn has_stranded(&self, kind: RecordKind) -> bool {
        lock(&self.stranded).contains(&kind)
    }

    /// Merge stranded records of `kind` if the primary answers again
    fn recover(&self, kind: RecordKind) {
        let mut stranded = lock(&self.stranded);
        if !stranded.contains(&kind) {
            return;
        }
        match self.merge_stranded(kind, |value| value_id(value).is_some()) {
            Ok(_) => {
                stranded.remove(&kind);
            }
            Err(e) => debug!(%kind, error = %e, "stranded records not merged yet"),
        }
    }

    /// Copy flat records into the primary, then keep only the unreadable ones
    ///
    /// Callers hold the `stranded` lock so merges of a kind never overlap.
    fn merge_stranded(&self, kind: RecordKind, readable: impl Fn(&Value) -> bool) -> StorageResult<usize> {
        let (Some(primary), Some(secondary)) = (&self.primary, &self.secondary) else {
            return Ok(0);
        };

        let flat = secondary.load(kind)?;
        if flat.is_empty() {
            return Ok(0);
        }

        let mut merged = 0;
        let mut unreadable = Vec::new();

        // Oldest first, so insertion order matches the flat list
        for value in flat.into_iter().rev() {
            let id = match value_id(&value).filter(|_| readable(&value)) {
                Some(id) => id,
                None => {
                    warn!(%kind, "keeping unreadable flat record");
                    unreadable.insert(0, value);
                    continue;
                }
            };

            match primary.get(kind, id)? {
                None => {
                    primary.insert(kind, id, &value)?;
                    merged += 1;
                }
                Some(existing) => {
                    let newer = match (updated_at(&value), updated_at(&existing)) {
                        (Some(flat), Some(stored)) => flat > stored,
                        _ => true,
                    };
                    if newer {
                        primary.put(kind, id, &value)?;
                        merged += 1;
                    }
                }
            }
        }

        secondary.save(kind, &unreadable)?;
        if merged > 0 {
            info!(%kind, merged, "reconciled flat store into primary");
        }
        Ok(merged)
    }

    fn load_values(&self, kind: RecordKind) -> (Vec<Value>, Tier) {
        self.recover(kind);
        if let Some(primary) = &self.primary {
            match primary.get_all(kind) {
                Ok(values) => return self.loaded(kind, values, Tier::Primary),
                Err(e) => warn!(%kind, error = %e, "primary load failed, falling back"),
            }
        }

        if let Some(secondary) = &self.secondary {
            match secondary.load(kind) {
                Ok(values) => return self.loaded(kind, values, Tier::Secondary),
                Err(e) => warn!(%kind, error = %e, "secondary load failed, falling back"),
            }
        }

        if self.is_persistent() {
            warn!(%kind, "no persistent tier reachable, serving memory copy");
        }
        let values = lock(&self.memory).get(&kind).cloned().unwrap_or_default();
        self.set_active(kind, Tier::Memory);
        (values, Tier::Memory)
    }

    fn loaded(&self, kind: RecordKind, values: Vec<Value>, tier: Tier) -> (Vec<Value>, Tier) {
        lock(&self.memory).insert(kind, values.clone());
        self.set_active(kind, tier);
        (values, tier)
    }

    fn write(&self, kind: RecordKind, mutation: Mutation<'_>) -> StorageResult<(Tier, bool)> {
        if !self.is_persistent() {
            let changed = apply(kind, lock(&self.memory).entry(kind).or_default(), &mutation)?;
            self.set_active(kind, Tier::Memory);
            return Ok((Tier::Memory, changed));
        }

        self.recover(kind);

        let primary_err = match &self.primary {
            Some(primary) => match apply_primary(primary.as_ref(), kind, &mutation) {
                Ok(changed) => return Ok(self.written(kind, &mutation, Tier::Primary, changed)),
                Err(e) if !e.is_tier_failure() => return Err(e),
                Err(e) => {
                    warn!(%kind, error = %e, "primary write failed, falling back");
                    e
                }
            },
            None => not_configured("primary"),
        };

        let secondary_err = match &self.secondary {
            Some(secondary) => match apply_flat(secondary.as_ref(), kind, &mutation) {
                Ok(changed) => return Ok(self.written(kind, &mutation, Tier::Secondary, changed)),
                Err(e) if !e.is_tier_failure() => return Err(e),
                Err(e) => e,
            },
            None => not_configured("secondary"),
        };

        warn!(%kind, "all storage tiers failed");
        Err(StorageError::AllTiersFailed {
            kind,
            primary: Box::new(primary_err),
            secondary: Box::new(secondary_err),
        })
    }

    fn written(&self, kind: RecordKind, mutation: &Mutation<'_>, tier: Tier, changed: bool) -> (Tier, bool) {
        if changed {
            // The memory copy may be incomplete; a mismatch there is not an error.
            let _ = apply(kind, lock(&self.memory).entry(kind).or_default(), mutation);
        }
        if tier == Tier::Secondary && changed && self.primary.is_some() {
            lock(&self.stranded).insert(kind);
        }
        self.set_active(kind, tier);
        debug!(%kind, %tier, changed, "write applied");
        (tier, changed)
    }

    fn set_active(&self, kind: RecordKind, tier: Tier) {
        lock(&self.active).insert(kind, tier);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_configured(tier: &'static str) -> StorageError {
    StorageError::Unavailable {
        tier,
        reason: "not configured".to_string(),
    }
}

fn apply_primary(primary: &dyn PrimaryStore, kind: RecordKind, mutation: &Mutation<'_>) -> StorageResult<bool> {
    match mutation {
        Mutation::Add(id, value) => primary.insert(kind, *id, value).map(|_| true),
        Mutation::Update(id, value) => primary.put(kind, *id, value).map(|_| true),
        Mutation::Delete(id) => primary.delete(kind, *id),
    }
}

fn apply_flat(secondary: &dyn FlatStore, kind: RecordKind, mutation: &Mutation<'_>) -> StorageResult<bool> {
    let mut records = secondary.load(kind)?;
    let changed = apply(kind, &mut records, mutation)?;
    if changed {
        secondary.save(kind, &records)?;
    }
    Ok(changed)
}

/// Apply a mutation to a whole collection held in memory
fn apply(kind: RecordKind, records: &mut Vec<Value>, mutation: &Mutation<'_>) -> StorageResult<bool> {
    match mutation {
        Mutation::Add(id, value) => {
            if position(records, *id).is_some() {
                return Err(StorageError::DuplicateId { kind, id: *id });
            }
            records.insert(0, (*value).clone());
            Ok(true)
        }
        Mutation::Update(id, value) => {
            let pos = position(records, *id).ok_or(StorageError::NotFound { kind, id: *id })?;
            records[pos] = (*value).clone();
            Ok(true)
        }
        Mutation::Delete(id) => {
            let before = records.len();
            records.retain(|v| value_id(v) != Some(*id));
            Ok(records.len() != before)
        }
    }
}

fn position(records: &[Value], id: RecordId) -> Option<usize> {
    records.iter().position(|v| value_id(v) == Some(id))
}

fn value_id(value: &Value) -> Option<RecordId> {
    value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| RecordId::parse(s).ok())
}

fn updated_at(value: &Value) -> Option<DateTime<Utc>> {
    value.get("updated_at")?.as_str()?.parse().ok()
}

fn decode_all<R: Record>(kind: RecordKind, values: Vec<Value>) -> Vec<R> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(%kind, error = %e, "skipping unreadable record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dream, DreamDraft};
    use crate::storage::{JsonFileStore, SqliteStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Primary that can be switched off mid-test
    struct Switchable {
        inner: SqliteStore,
        down: Arc<AtomicBool>,
    }

    impl Switchable {
        fn check(&self) -> StorageResult<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable {
                    tier: "primary",
                    reason: "switched off".to_string(),
                });
            }
            Ok(())
        }
    }

    impl PrimaryStore for Switchable {
        fn get(&self, kind: RecordKind, id: RecordId) -> StorageResult<Option<Value>> {
            self.check()?;
            self.inner.get(kind, id)
        }
        fn get_all(&self, kind: RecordKind) -> StorageResult<Vec<Value>> {
            self.check()?;
            self.inner.get_all(kind)
        }
        fn insert(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()> {
            self.check()?;
            self.inner.insert(kind, id, record)
        }
        fn put(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()> {
            self.check()?;
            self.inner.put(kind, id, record)
        }
        fn delete(&self, kind: RecordKind, id: RecordId) -> StorageResult<bool> {
            self.check()?;
            self.inner.delete(kind, id)
        }
    }

    struct BrokenFlat;

    impl FlatStore for BrokenFlat {
        fn load(&self, _kind: RecordKind) -> StorageResult<Vec<Value>> {
            Err(StorageError::Unavailable {
                tier: "secondary",
                reason: "quota exceeded".to_string(),
            })
        }
        fn save(&self, _kind: RecordKind, _records: &[Value]) -> StorageResult<()> {
            self.load(RecordKind::Dream).map(|_| ())
        }
    }

    fn switchable() -> (Box<dyn PrimaryStore>, Arc<AtomicBool>) {
        let down = Arc::new(AtomicBool::new(false));
        let store = Switchable {
            inner: SqliteStore::open_in_memory().unwrap(),
            down: Arc::clone(&down),
        };
        (Box::new(store), down)
    }

    fn dream(content: &str) -> Dream {
        DreamDraft::new(content).into_dream().unwrap()
    }

    /// Fixed sequence: add three, update the first, delete the second
    async fn run_sequence(adapter: &StorageAdapter, dreams: &[Dream], edited: &Dream) -> Vec<Dream> {
        for d in dreams {
            adapter.add_record(d).await.unwrap();
        }
        adapter.update_record(edited).await.unwrap();
        assert!(adapter
            .delete_record(RecordKind::Dream, dreams[1].id)
            .await
            .unwrap());
        adapter.load_records::<Dream>().await
    }

    #[tokio::test]
    async fn test_fallback_matches_primary_result() {
        let dreams = vec![dream("one"), dream("two"), dream("three")];
        let mut edited = dreams[0].clone();
        edited.set_content("edited");

        let primary_only = StorageAdapter::new(Some(Box::new(SqliteStore::open_in_memory().unwrap())), None);
        let expected = run_sequence(&primary_only, &dreams, &edited).await;
        assert_eq!(primary_only.active_tier(RecordKind::Dream), Some(Tier::Primary));

        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let degraded = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));
        down.store(true, Ordering::SeqCst);
        let actual = run_sequence(&degraded, &dreams, &edited).await;
        assert_eq!(degraded.active_tier(RecordKind::Dream), Some(Tier::Secondary));

        assert_eq!(actual, expected);
        let contents: Vec<&str> = actual.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "edited"]);
    }

    #[tokio::test]
    async fn test_write_reports_serving_tier() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));

        assert_eq!(adapter.add_record(&dream("a")).await.unwrap(), Tier::Primary);
        down.store(true, Ordering::SeqCst);
        assert_eq!(adapter.add_record(&dream("b")).await.unwrap(), Tier::Secondary);
    }

    #[tokio::test]
    async fn test_all_tiers_failing_is_reported() {
        let (primary, down) = switchable();
        down.store(true, Ordering::SeqCst);
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(BrokenFlat)));

        let err = adapter.add_record(&dream("lost?")).await.unwrap_err();
        assert!(matches!(err, StorageError::AllTiersFailed { kind: RecordKind::Dream, .. }));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_memory_copy() {
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(BrokenFlat)));

        let d = dream("remembered");
        adapter.add_record(&d).await.unwrap();
        assert_eq!(adapter.load_records::<Dream>().await, vec![d.clone()]);

        down.store(true, Ordering::SeqCst);
        assert_eq!(adapter.load_records::<Dream>().await, vec![d]);
        assert_eq!(adapter.active_tier(RecordKind::Dream), Some(Tier::Memory));
    }

    #[tokio::test]
    async fn test_memory_only_adapter_accepts_writes() {
        let adapter = StorageAdapter::in_memory();
        assert!(!adapter.is_persistent());

        let d = dream("volatile");
        assert_eq!(adapter.add_record(&d).await.unwrap(), Tier::Memory);
        assert_eq!(adapter.load_records::<Dream>().await, vec![d.clone()]);
        assert!(adapter.delete_record(RecordKind::Dream, d.id).await.unwrap());
        assert!(adapter.load_records::<Dream>().await.is_empty());
    }

    #[tokio::test]
    async fn test_logical_errors_do_not_fall_back() {
        let temp_dir = TempDir::new().unwrap();
        let flat = JsonFileStore::new(temp_dir.path());
        let adapter = StorageAdapter::new(
            Some(Box::new(SqliteStore::open_in_memory().unwrap())),
            Some(Box::new(JsonFileStore::new(temp_dir.path()))),
        );

        let d = dream("once");
        adapter.add_record(&d).await.unwrap();
        let err = adapter.add_record(&d).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId { .. }));

        let ghost = dream("ghost");
        let err = adapter.update_record(&ghost).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        // Nothing leaked into the flat store
        assert!(flat.load(RecordKind::Dream).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let adapter = StorageAdapter::new(Some(Box::new(SqliteStore::open_in_memory().unwrap())), None);
        assert!(!adapter
            .delete_record(RecordKind::Goal, RecordId::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_flat_entries_are_skipped_and_kept() {
        let temp_dir = TempDir::new().unwrap();
        let flat = JsonFileStore::new(temp_dir.path());
        flat.save(RecordKind::Dream, &[json!({"id": 17, "title": "legacy"})])
            .unwrap();

        let adapter = StorageAdapter::new(None, Some(Box::new(JsonFileStore::new(temp_dir.path()))));
        let d = dream("new");
        adapter.add_record(&d).await.unwrap();

        assert_eq!(adapter.load_records::<Dream>().await, vec![d]);
        assert_eq!(flat.load(RecordKind::Dream).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_record_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));

        down.store(true, Ordering::SeqCst);
        let d = dream("flat only");
        adapter.add_record(&d).await.unwrap();

        let found: Option<Dream> = adapter.get_record(d.id).await.unwrap();
        assert_eq!(found, Some(d));
    }

    #[tokio::test]
    async fn test_reconcile_moves_stranded_records() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));

        let kept = dream("written while healthy");
        adapter.add_record(&kept).await.unwrap();

        down.store(true, Ordering::SeqCst);
        let stranded_a = dream("outage a");
        let stranded_b = dream("outage b");
        adapter.add_record(&stranded_a).await.unwrap();
        adapter.add_record(&stranded_b).await.unwrap();

        down.store(false, Ordering::SeqCst);
        assert_eq!(adapter.reconcile::<Dream>().await.unwrap(), 2);
        assert_eq!(adapter.reconcile::<Dream>().await.unwrap(), 0);

        let contents: Vec<String> = adapter
            .load_records::<Dream>()
            .await
            .into_iter()
            .map(|d| d.content)
            .collect();
        assert_eq!(contents, vec!["outage b", "outage a", "written while healthy"]);
    }

    #[tokio::test]
    async fn test_outage_records_survive_primary_recovery() {
        let temp_dir = TempDir::new().unwrap();
        let flat = JsonFileStore::new(temp_dir.path());
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));
        let healthy = dream("before the outage");
        adapter.add_record(&healthy).await.unwrap();

        down.store(true, Ordering::SeqCst);
        let outage = dream("during the outage");
        assert_eq!(adapter.add_record(&outage).await.unwrap(), Tier::Secondary);
        assert!(adapter.has_stranded(RecordKind::Dream));

        down.store(false, Ordering::SeqCst);
        let ids: Vec<RecordId> = adapter
            .load_records::<Dream>()
            .await
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![outage.id, healthy.id]);
        assert!(!adapter.has_stranded(RecordKind::Dream));
        assert!(flat.load(RecordKind::Dream).unwrap().is_empty());

        let mut edited = outage.clone();
        edited.set_content("remembered later");
        assert_eq!(adapter.update_record(&edited).await.unwrap(), Tier::Primary);
        let found: Option<Dream> = adapter.get_record(outage.id).await.unwrap();
        assert_eq!(found, Some(edited));
    }

    #[tokio::test]
    async fn test_get_after_recovery_finds_outage_record() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));

        down.store(true, Ordering::SeqCst);
        let outage = dream("looked up first");
        adapter.add_record(&outage).await.unwrap();

        down.store(false, Ordering::SeqCst);
        let found: Option<Dream> = adapter.get_record(outage.id).await.unwrap();
        assert_eq!(found, Some(outage));
        assert!(!adapter.has_stranded(RecordKind::Dream));
    }

    #[tokio::test]
    async fn test_delete_after_recovery_does_not_resurrect() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));

        down.store(true, Ordering::SeqCst);
        let outage = dream("short lived");
        adapter.add_record(&outage).await.unwrap();

        down.store(false, Ordering::SeqCst);
        assert!(adapter
            .delete_record(RecordKind::Dream, outage.id)
            .await
            .unwrap());
        assert!(adapter.load_records::<Dream>().await.is_empty());
        assert_eq!(adapter.active_tier(RecordKind::Dream), Some(Tier::Primary));
    }

    #[tokio::test]
    async fn test_newer_flat_copy_wins_on_recovery() {
        let temp_dir = TempDir::new().unwrap();
        let (primary, down) = switchable();
        let adapter = StorageAdapter::new(Some(primary), Some(Box::new(JsonFileStore::new(temp_dir.path()))));
        let original = dream("first draft");
        adapter.add_record(&original).await.unwrap();

        // A newer copy left in the flat store by an earlier outage
        let mut newer = original.clone();
        newer.set_content("second draft");
        JsonFileStore::new(temp_dir.path())
            .save(RecordKind::Dream, &[serde_json::to_value(&newer).unwrap()])
            .unwrap();
        down.store(true, Ordering::SeqCst);
        let other = dream("marks the kind");
        adapter.add_record(&other).await.unwrap();

        down.store(false, Ordering::SeqCst);
        let found: Option<Dream> = adapter.get_record(original.id).await.unwrap();
        assert_eq!(found.map(|d| d.content), Some("second draft".to_string()));
        assert_eq!(adapter.load_records::<Dream>().await.len(), 2);
    }
}
