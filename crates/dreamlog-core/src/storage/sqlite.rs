//! SQLite primary store
//!
//! Keyed, indexed access to each record kind. Records are stored as JSON
//! text so every tier persists the same representation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;

use crate::models::{RecordId, RecordKind};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::PrimaryStore;

/// Primary store backed by a single SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records of `kind`
    pub fn count(&self, kind: RecordKind) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.collection());
        Ok(self.conn().query_row(&sql, [], |row| row.get(0))?)
    }
}

impl PrimaryStore for SqliteStore {
    fn get(&self, kind: RecordKind, id: RecordId) -> StorageResult<Option<Value>> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", kind.collection());
        let data: Option<String> = self
            .conn()
            .query_row(&sql, params![id.to_string()], |row| row.get(0))
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn get_all(&self, kind: RecordKind) -> StorageResult<Vec<Value>> {
        let sql = format!("SELECT data FROM {} ORDER BY rowid DESC", kind.collection());
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn insert(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()> {
        let sql = format!("INSERT INTO {} (id, data) VALUES (?1, ?2)", kind.collection());
        let data = serde_json::to_string(record)?;

        match self.conn().execute(&sql, params![id.to_string(), data]) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::DuplicateId { kind, id })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, kind: RecordKind, id: RecordId, record: &Value) -> StorageResult<()> {
        let sql = format!("UPDATE {} SET data = ?2 WHERE id = ?1", kind.collection());
        let data = serde_json::to_string(record)?;

        let changed = self.conn().execute(&sql, params![id.to_string(), data])?;
        if changed == 0 {
            return Err(StorageError::NotFound { kind, id });
        }
        Ok(())
    }

    fn delete(&self, kind: RecordKind, id: RecordId) -> StorageResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.collection());
        let changed = self.conn().execute(&sql, params![id.to_string()])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(id: RecordId, title: &str) -> Value {
        json!({ "id": id.to_string(), "title": title })
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = RecordId::new();

        store.insert(RecordKind::Dream, id, &record(id, "Falling")).unwrap();

        let loaded = store.get(RecordKind::Dream, id).unwrap().unwrap();
        assert_eq!(loaded["title"], "Falling");
        assert!(store.get(RecordKind::Goal, id).unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_is_logical_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = RecordId::new();
        store.insert(RecordKind::Goal, id, &record(id, "one")).unwrap();

        let err = store
            .insert(RecordKind::Goal, id, &record(id, "two"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId { .. }));
        assert!(!err.is_tier_failure());
    }

    #[test]
    fn test_get_all_newest_first_and_update_keeps_position() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ids: Vec<RecordId> = (0..3).map(|_| RecordId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            store
                .insert(RecordKind::Dream, *id, &record(*id, &format!("dream {}", i)))
                .unwrap();
        }

        store
            .put(RecordKind::Dream, ids[0], &record(ids[0], "edited"))
            .unwrap();

        let titles: Vec<String> = store
            .get_all(RecordKind::Dream)
            .unwrap()
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["dream 2", "dream 1", "edited"]);
    }

    #[test]
    fn test_put_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = RecordId::new();
        let err = store
            .put(RecordKind::VoiceNote, id, &record(id, "x"))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = RecordId::new();
        store.insert(RecordKind::Dream, id, &record(id, "x")).unwrap();

        assert!(store.delete(RecordKind::Dream, id).unwrap());
        assert!(!store.delete(RecordKind::Dream, id).unwrap());
        assert_eq!(store.count(RecordKind::Dream).unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dreamlog.db");
        let id = RecordId::new();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(RecordKind::Dream, id, &record(id, "kept")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count(RecordKind::Dream).unwrap(), 1);
        assert_eq!(
            store.get(RecordKind::Dream, id).unwrap().unwrap()["title"],
            "kept"
        );
    }
}
