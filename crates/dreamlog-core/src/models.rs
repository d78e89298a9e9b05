//! Data models for dreamlog
//!
//! Defines the journal records: Dream, Goal and VoiceNote, plus the drafts
//! they are created from. Every record carries a [`RecordId`] that is
//! assigned once at creation and never changes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::mutex::MutexName;

/// Maximum length of a record title, in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Title used when a dream is saved without one
pub const DEFAULT_DREAM_TITLE: &str = "Untitled Dream";

/// Canonical identifier for every journal record
///
/// Serialised as the hyphenated UUID string. Text arriving from outside is
/// parsed exactly once; anything that is not a UUID is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its textual form
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(s.to_string()))
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short form used in listings
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// The kinds of record the journal stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Dream,
    Goal,
    VoiceNote,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Dream, RecordKind::Goal, RecordKind::VoiceNote];

    /// Name of the collection (SQLite table, flat file stem)
    pub fn collection(self) -> &'static str {
        match self {
            RecordKind::Dream => "dreams",
            RecordKind::Goal => "goals",
            RecordKind::VoiceNote => "voice_notes",
        }
    }

    /// The mutex that serializes writes to this kind's collection
    pub fn save_mutex(self) -> MutexName {
        match self {
            RecordKind::Dream => MutexName::EntrySave,
            RecordKind::Goal => MutexName::GoalSave,
            RecordKind::VoiceNote => MutexName::VoiceNoteSave,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Dream => "dream",
            RecordKind::Goal => "goal",
            RecordKind::VoiceNote => "voice note",
        };
        f.write_str(name)
    }
}

/// Common behaviour of every persisted record
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> RecordId;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// A dream journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dream {
    pub id: RecordId,
    pub title: String,
    pub content: String,
    /// Emotions felt during the dream
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_lucid: bool,
    /// Night the dream happened, if different from the creation day
    #[serde(default)]
    pub dream_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dream {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    pub fn set_lucid(&mut self, is_lucid: bool) {
        self.is_lucid = is_lucid;
        self.touch();
    }

    /// Add a tag (normalized, ignored if already present)
    pub fn add_tag(&mut self, tag: &str) {
        let tag = normalize_tag(tag);
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
            self.touch();
        }
    }

    /// Set all tags (replacing existing)
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = normalize_tags(tags);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Check the fields an update must still satisfy
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyField("content"));
        }
        check_title(&self.title)
    }
}

impl Record for Dream {
    const KIND: RecordKind = RecordKind::Dream;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Input for a new dream
#[derive(Debug, Clone, Default)]
pub struct DreamDraft {
    pub title: Option<String>,
    pub content: String,
    pub emotions: Vec<String>,
    pub tags: Vec<String>,
    pub is_lucid: bool,
    pub dream_date: Option<NaiveDate>,
}

impl DreamDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn lucid(mut self, is_lucid: bool) -> Self {
        self.is_lucid = is_lucid;
        self
    }

    /// Normalize, validate and turn the draft into a new dream
    pub fn into_dream(self) -> Result<Dream, ValidationError> {
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(ValidationError::EmptyField("content"));
        }

        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_DREAM_TITLE.to_string(),
        };
        check_title(&title)?;

        let now = Utc::now();
        Ok(Dream {
            id: RecordId::new(),
            title,
            content,
            emotions: normalize_tags(self.emotions),
            tags: normalize_tags(self.tags),
            is_lucid: self.is_lucid,
            dream_date: self.dream_date,
            created_at: now,
            updated_at: now,
        })
    }
}

/// What a goal measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    LucidCount,
    RecallStreak,
    JournalingStreak,
    Custom,
}

impl FromStr for GoalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lucid_count" | "lucid" => Ok(GoalType::LucidCount),
            "recall_streak" | "recall" => Ok(GoalType::RecallStreak),
            "journaling_streak" | "journaling" | "streak" => Ok(GoalType::JournalingStreak),
            "custom" => Ok(GoalType::Custom),
            other => Err(ValidationError::InvalidValue {
                field: "goal_type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalType::LucidCount => "lucid-count",
            GoalType::RecallStreak => "recall-streak",
            GoalType::JournalingStreak => "journaling-streak",
            GoalType::Custom => "custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        };
        f.write_str(name)
    }
}

/// A journaling goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal_type: GoalType,
    pub target: u32,
    #[serde(default)]
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn set_status(&mut self, status: GoalStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_title(&self.title)?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.target == 0 {
            return Err(ValidationError::OutOfRange {
                field: "target",
                min: 1,
            });
        }
        Ok(())
    }
}

impl Record for Goal {
    const KIND: RecordKind = RecordKind::Goal;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Input for a new goal
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub title: String,
    pub description: String,
    pub goal_type: GoalType,
    pub target: u32,
}

impl GoalDraft {
    pub fn new(title: impl Into<String>, goal_type: GoalType, target: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            goal_type,
            target,
        }
    }

    pub fn into_goal(self) -> Result<Goal, ValidationError> {
        let now = Utc::now();
        let goal = Goal {
            id: RecordId::new(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            goal_type: self.goal_type,
            target: self.target,
            status: GoalStatus::Active,
            created_at: now,
            updated_at: now,
        };
        goal.validate()?;
        Ok(goal)
    }
}

/// Metadata for a recorded voice note
///
/// The audio itself lives outside the journal store; only its description
/// and transcription are kept here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceNote {
    pub id: RecordId,
    pub title: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub transcription: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VoiceNote {
    pub fn set_transcription(&mut self, text: Option<String>) {
        self.transcription = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_title(&self.title)?;
        if self.duration_secs.is_nan() || self.duration_secs <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_secs",
                value: self.duration_secs.to_string(),
            });
        }
        Ok(())
    }
}

impl Record for VoiceNote {
    const KIND: RecordKind = RecordKind::VoiceNote;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Input for a new voice note
#[derive(Debug, Clone)]
pub struct VoiceNoteDraft {
    pub title: Option<String>,
    pub duration_secs: f64,
    pub size_bytes: u64,
    pub mime_type: String,
    pub transcription: Option<String>,
}

impl VoiceNoteDraft {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            title: None,
            duration_secs,
            size_bytes: 0,
            mime_type: "audio/webm".to_string(),
            transcription: None,
        }
    }

    pub fn into_voice_note(self) -> Result<VoiceNote, ValidationError> {
        let now = Utc::now();
        let title = match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Voice note {}", now.format("%Y-%m-%d %H:%M")),
        };

        let mut note = VoiceNote {
            id: RecordId::new(),
            title,
            duration_secs: self.duration_secs,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.trim().to_string(),
            transcription: None,
            created_at: now,
            updated_at: now,
        };
        note.set_transcription(self.transcription);
        note.updated_at = now;
        note.validate()?;
        Ok(note)
    }
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            max: MAX_TITLE_LEN,
            actual: len,
        });
    }
    Ok(())
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Trim, lower-case and de-duplicate, keeping first-seen order
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = normalize_tag(&tag);
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_parse_roundtrip() {
        let id = RecordId::new();
        let parsed = RecordId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_record_id_rejects_non_uuid() {
        let err = RecordId::parse("42").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidId(ref s) if s == "42"));
    }

    #[test]
    fn test_record_id_serializes_as_string() {
        let id = RecordId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn test_dream_draft_defaults_title() {
        let dream = DreamDraft::new("  flying over the sea  ").into_dream().unwrap();
        assert_eq!(dream.title, DEFAULT_DREAM_TITLE);
        assert_eq!(dream.content, "flying over the sea");
        assert_eq!(dream.created_at, dream.updated_at);
    }

    #[test]
    fn test_dream_draft_requires_content() {
        let err = DreamDraft::new("   ").into_dream().unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("content"));
    }

    #[test]
    fn test_dream_draft_normalizes_tags() {
        let dream = DreamDraft::new("content")
            .with_tags([" Flying", "flying", "", "Water "])
            .into_dream()
            .unwrap();
        assert_eq!(dream.tags, vec!["flying", "water"]);
    }

    #[test]
    fn test_dream_title_too_long() {
        let err = DreamDraft::new("content")
            .with_title("x".repeat(MAX_TITLE_LEN + 1))
            .into_dream()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "title", .. }));
    }

    #[test]
    fn test_dream_add_tag_ignores_duplicates() {
        let mut dream = DreamDraft::new("content").into_dream().unwrap();
        dream.add_tag("Lucid");
        dream.add_tag("lucid");
        assert_eq!(dream.tags, vec!["lucid"]);
    }

    #[test]
    fn test_goal_draft_validation() {
        assert!(GoalDraft::new("Ten lucid dreams", GoalType::LucidCount, 10)
            .into_goal()
            .is_ok());

        let err = GoalDraft::new("  ", GoalType::Custom, 1)
            .into_goal()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("title"));

        let err = GoalDraft::new("Zero", GoalType::Custom, 0)
            .into_goal()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "target", .. }));
    }

    #[test]
    fn test_goal_type_from_str() {
        assert_eq!("lucid-count".parse::<GoalType>().unwrap(), GoalType::LucidCount);
        assert_eq!("streak".parse::<GoalType>().unwrap(), GoalType::JournalingStreak);
        assert!("weekly".parse::<GoalType>().is_err());
    }

    #[test]
    fn test_voice_note_draft() {
        let mut draft = VoiceNoteDraft::new(12.5);
        draft.transcription = Some("   ".to_string());
        let note = draft.into_voice_note().unwrap();
        assert!(note.title.starts_with("Voice note "));
        assert!(note.transcription.is_none());

        let err = VoiceNoteDraft::new(0.0).into_voice_note().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { field: "duration_secs", .. }));
    }

    #[test]
    fn test_save_mutex_per_kind() {
        assert_eq!(RecordKind::Dream.save_mutex(), MutexName::EntrySave);
        assert_eq!(RecordKind::Goal.save_mutex(), MutexName::GoalSave);
        assert_eq!(RecordKind::VoiceNote.save_mutex(), MutexName::VoiceNoteSave);
    }
}
