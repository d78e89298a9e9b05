//! Journal error handling
//!
//! Every failure the coordinator reports falls into one of three buckets:
//! the input was invalid, storage failed on every tier, or a two-phase
//! delete was confirmed or cancelled when nothing was pending.

use thiserror::Error;

use crate::models::{RecordId, RecordKind};
use crate::storage::StorageError;

/// Input rejected before any mutex or storage interaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid record id")]
    InvalidId(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} is too long ({actual} characters, max {max})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} must be at least {min}")]
    OutOfRange { field: &'static str, min: u64 },

    #[error("invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Errors returned by [`crate::Journal`] operations
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("No delete is pending for {0}")]
    DeleteNotPending(RecordId),

    #[error("A delete of {0} is already being confirmed")]
    DeleteInFlight(RecordId),

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: RecordId },
}

impl JournalError {
    /// True when the caller supplied bad input
    pub fn is_validation(&self) -> bool {
        matches!(self, JournalError::Validation(_))
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
