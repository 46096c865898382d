//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Caller-supplied identifier correlating one generation run with one live channel
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Accept any non-blank token
    pub fn new(token: impl Into<String>) -> SharedResult<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SharedError::InvalidSessionId { input: token });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Accept only UUID-formatted tokens (the HTTP surface requires this)
    pub fn parse_uuid(token: &str) -> SharedResult<Self> {
        let uuid = Uuid::parse_str(token.trim()).map_err(|_| SharedError::InvalidSessionId {
            input: token.to_string(),
        })?;
        Ok(Self(uuid.to_string()))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of question the backend is asked to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    #[serde(rename = "single choice")]
    SingleChoice,
    #[serde(rename = "fill in the blank")]
    FillInTheBlank,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::SingleChoice => "single choice",
            ItemKind::FillInTheBlank => "fill in the blank",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "single choice" => Ok(ItemKind::SingleChoice),
            "fill in the blank" => Ok(ItemKind::FillInTheBlank),
            _ => Err(SharedError::UnknownItemKind { input: s.to_string() }),
        }
    }
}

/// Language of generated questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ja,
    Vi,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Vi => "vi",
        }
    }

    /// Human-readable name used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Vi => "Vietnamese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ja" => Ok(Language::Ja),
            "vi" => Ok(Language::Vi),
            _ => Err(SharedError::UnknownLanguage { input: s.to_string() }),
        }
    }
}

/// Difficulty from 1 (very easy) to 5 (very difficult)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> SharedResult<Self> {
        if value < Self::MIN as i64 || value > Self::MAX as i64 {
            return Err(SharedError::DifficultyOutOfRange { value });
        }
        Ok(Self(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<i64> for DifficultyLevel {
    type Error = SharedError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated parameters of one generation run
///
/// Fields are private so a constructed request always satisfies
/// `target_item_count >= 1`; kind, language and difficulty are validated
/// by their own types.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    target_item_count: u32,
    item_kind: ItemKind,
    language: Language,
    difficulty: DifficultyLevel,
    save_data: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(
        target_item_count: i64,
        item_kind: ItemKind,
        language: Language,
        difficulty: DifficultyLevel,
        save_data: Map<String, Value>,
    ) -> SharedResult<Self> {
        if target_item_count < 1 || target_item_count > u32::MAX as i64 {
            return Err(SharedError::InvalidTargetCount { value: target_item_count });
        }

        Ok(Self {
            target_item_count: target_item_count as u32,
            item_kind,
            language,
            difficulty,
            save_data,
        })
    }

    /// Request with default kind, language and difficulty
    pub fn with_count(target_item_count: i64) -> SharedResult<Self> {
        Self::new(
            target_item_count,
            ItemKind::default(),
            Language::default(),
            DifficultyLevel::default(),
            Map::new(),
        )
    }

    pub fn target_item_count(&self) -> u32 {
        self.target_item_count
    }

    pub fn item_kind(&self) -> ItemKind {
        self.item_kind
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn save_data(&self) -> &Map<String, Value> {
        &self.save_data
    }
}

/// Per-item progress, always published together with its item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub total: u32,
    pub generated: u32,
    pub percent: u32,
}

impl ProgressEvent {
    pub fn new(generated: u32, total: u32) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((generated as f64 / total as f64) * 100.0).round() as u32
        };

        Self { total, generated, percent }
    }
}

/// One published item: the generated question plus run progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub question: Value,
    pub progress: ProgressEvent,
}

/// Terminal summary of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFinished {
    pub generated: u32,
    pub total: u32,
    pub dropped_chunks: u32,
    pub cancelled: bool,
}

/// Events carried by a session channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Item(ItemEvent),
    Finished(RunFinished),
}

impl SessionEvent {
    /// Event name used on the wire (SSE `event:` field)
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::Item(_) => "question",
            SessionEvent::Finished(_) => "finished",
        }
    }

    /// Payload without the enum tag
    pub fn payload(&self) -> Value {
        match self {
            SessionEvent::Item(item) => serde_json::to_value(item).unwrap_or(Value::Null),
            SessionEvent::Finished(done) => serde_json::to_value(done).unwrap_or(Value::Null),
        }
    }
}
