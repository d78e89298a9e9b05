//! Flat JSON secondary store
//!
//! Each record kind is one JSON array in `<dir>/<collection>.json`. Every
//! write replaces the whole file, using atomic writes (write to a temp
//! file, sync, then rename) so a crash never leaves a half-written list.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::models::RecordKind;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::FlatStore;

/// Secondary store keeping one JSON file per record kind
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `kind`'s collection
    pub fn path(&self, kind: RecordKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.collection()))
    }
}

impl FlatStore for JsonFileStore {
    fn load(&self, kind: RecordKind) -> StorageResult<Vec<Value>> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|source| StorageError::ReadError {
            path: path.clone(),
            source,
        })?;

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(_) => Err(StorageError::InvalidFormat {
                path,
                details: "expected a JSON array".to_string(),
            }),
            Err(e) => Err(StorageError::InvalidFormat {
                path,
                details: e.to_string(),
            }),
        }
    }

    fn save(&self, kind: RecordKind, records: &[Value]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(records)?;
        atomic_write(&self.path(kind), &bytes)
    }
}

/// Write data to a file atomically
///
/// The target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let write_err = |source| StorageError::WriteError {
        path: temp_path.clone(),
        source,
    };

    let mut file = File::create(&temp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
