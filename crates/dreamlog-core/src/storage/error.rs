//! Storage error handling
//!
//! Separates tier failures (the backend is unreachable or broke mid-write,
//! which triggers fallback to the next tier) from logical outcomes (the
//! record already exists, or is missing) that every tier would agree on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{RecordId, RecordKind};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create a storage directory
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Flat collection file is not a JSON array
    #[error("Invalid collection format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend has been switched off or was never reachable
    #[error("{tier} store unavailable: {reason}")]
    Unavailable { tier: &'static str, reason: String },

    /// Add of an id that is already stored
    #[error("{kind} {id} already exists")]
    DuplicateId { kind: RecordKind, id: RecordId },

    /// Update of an id that is not stored
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: RecordId },

    /// Every configured persistent tier failed
    #[error("All storage tiers failed for {kind}: primary: {primary}; secondary: {secondary}")]
    AllTiersFailed {
        kind: RecordKind,
        primary: Box<StorageError>,
        secondary: Box<StorageError>,
    },
}

impl StorageError {
    /// Whether the next tier should be tried
    ///
    /// Logical outcomes are the same on every tier and are returned as-is.
    pub fn is_tier_failure(&self) -> bool {
        !matches!(
            self,
            StorageError::DuplicateId { .. } | StorageError::NotFound { .. }
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
