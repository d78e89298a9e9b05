//! Storage layer
//!
//! Persists journal records across three tiers, tried in order:
//!
//! - **Primary**: keyed, indexed store ([`SqliteStore`])
//! - **Secondary**: one flat JSON list per kind ([`JsonFileStore`])
//! - **Memory**: in-process copy of the last known collections
//!
//! [`StorageAdapter`] hides the tiers from callers. Backends implement the
//! two small traits below; they are synchronous and only report success or
//! failure, the adapter decides what to fall back to.

pub mod adapter;
pub mod error;
pub mod flat;
pub mod schema;
pub mod sqlite;

use serde_json::Value;

use crate::models::{RecordId, RecordKind};

pub use adapter::{StorageAdapter, Tier};
pub use error::{StorageError, StorageResult};
pub use flat::JsonFileStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;

/// Structured store with per-record access
pub trait PrimaryStore: Send + Sync {
    fn get(&self, kind: RecordKind, id: RecordId) -> StorageResult<Option<Value>>;

    /// All records of `kind`, most recently inserted first
    fn get_all(&self, kind: RecordKind) -> StorageResult<Vec<Value>>;

    /// Store a new record; an existing id is [`StorageError::DuplicateId`]
    fn insert(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()>;

    /// Replace a stored record in place; a missing id is [`StorageError::NotFound`]
    fn put(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()>;

    /// Remove a record, returning whether it existed
    fn delete(&self, kind: RecordKind, id: RecordId) -> StorageResult<bool>;
}

/// Store that only reads and writes whole collections
pub trait FlatStore: Send + Sync {
    fn load(&self, kind: RecordKind) -> StorageResult<Vec<Value>>;
    fn save(&self, kind: RecordKind, records: &[Value]) -> StorageResult<()>;
}
