//! dreamlog Core Library
//!
//! This crate provides the core of dreamlog, a local-first dream journal.
//! It keeps dreams, goals and voice notes consistent while several
//! asynchronous actions try to change them at once.
//!
//! # Architecture
//!
//! - **Named mutexes**: one FIFO lock per resource class serializes every
//!   mutation of a collection
//! - **Tiered storage**: SQLite first, a flat JSON store when SQLite fails,
//!   an in-memory copy when both do
//! - **View state**: pagination, show-all and endless scroll over a filtered
//!   snapshot, recomputed after every mutation
//!
//! # Quick Start
//!
//! ```text
//! let journal = Journal::open(Config::load()?).await;
//!
//! let dream = journal.save_dream(DreamDraft::new("Flying over the sea")).await?;
//! let page = journal.display_dreams(&ViewQuery::all()).await;
//! ```
//!
//! # Modules
//!
//! - `journal`: Mutation coordinator (main entry point)
//! - `models`: Dreams, goals, voice notes and their ids
//! - `mutex`: Named mutex registry
//! - `storage`: Primary, secondary and memory tiers
//! - `delete`: Two-phase delete countdowns
//! - `view`: Pagination and endless scroll
//! - `debounce`: Search input debouncing
//! - `config`: Application configuration

pub mod config;
pub mod debounce;
pub mod delete;
pub mod error;
pub mod journal;
pub mod models;
pub mod mutex;
pub mod storage;
pub mod view;

pub use config::Config;
pub use debounce::Debouncer;
pub use delete::{DeleteState, PendingDelete};
pub use error::{JournalError, JournalResult, ValidationError};
pub use journal::{CollectionStats, DisplayPage, Journal, JournalStats};
pub use models::{
    Dream, DreamDraft, Goal, GoalDraft, GoalStatus, GoalType, Record, RecordId, RecordKind,
    VoiceNote, VoiceNoteDraft,
};
pub use mutex::{MutexName, MutexRegistry, MutexStatus};
pub use storage::{StorageAdapter, StorageError, Tier};
pub use view::{
    generate_page_numbers, ListenerChange, PageItem, PaginationMode, ScrollPosition,
    ViewController, ViewQuery, ViewWindow,
};
