//! Request and response shapes of the HTTP surface

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{
    DifficultyLevel, GenerationRequest, ItemKind, Language, SessionId, SharedError, SharedResult,
};

pub const FIELD_FILE: &str = "file";
pub const FIELD_SESSION_ID: &str = "sessionId";
pub const FIELD_QUESTION_TYPE: &str = "questionType";
pub const FIELD_NUMBER_OF_QUESTIONS: &str = "numberOfQuestions";
pub const FIELD_LANGUAGE: &str = "language";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_SAVE_DATA: &str = "saveData";

pub const DEFAULT_NUMBER_OF_QUESTIONS: i64 = 1;

/// Uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw multipart fields of an upload, before validation
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub file: Option<UploadedFile>,
    pub session_id: Option<String>,
    pub question_type: Option<String>,
    pub number_of_questions: Option<String>,
    pub language: Option<String>,
    pub level: Option<String>,
    pub save_data: Option<String>,
}

impl UploadFields {
    /// Store a text field by its form name; unknown names are ignored
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            FIELD_SESSION_ID => &mut self.session_id,
            FIELD_QUESTION_TYPE => &mut self.question_type,
            FIELD_NUMBER_OF_QUESTIONS => &mut self.number_of_questions,
            FIELD_LANGUAGE => &mut self.language,
            FIELD_LEVEL => &mut self.level,
            FIELD_SAVE_DATA => &mut self.save_data,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn session_id(&self) -> SharedResult<SessionId> {
        SessionId::parse_uuid(self.session_id.as_deref().unwrap_or_default())
    }

    /// Build the validated generation request, applying form defaults
    pub fn generation_request(&self) -> SharedResult<GenerationRequest> {
        let item_kind = non_blank(&self.question_type)
            .map(str::parse::<ItemKind>)
            .transpose()?
            .unwrap_or_default();
        let language = non_blank(&self.language)
            .map(str::parse::<Language>)
            .transpose()?
            .unwrap_or_default();

        let target = match non_blank(&self.number_of_questions) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| not_an_integer(FIELD_NUMBER_OF_QUESTIONS, raw))?,
            None => DEFAULT_NUMBER_OF_QUESTIONS,
        };
        let difficulty = match non_blank(&self.level) {
            Some(raw) => {
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| not_an_integer(FIELD_LEVEL, raw))?;
                DifficultyLevel::new(value)?
            }
            None => DifficultyLevel::default(),
        };

        let save_data = self
            .save_data
            .as_deref()
            .map(lenient_save_data)
            .unwrap_or_default();

        GenerationRequest::new(target, item_kind, language, difficulty, save_data)
    }
}

fn not_an_integer(field: &str, input: &str) -> SharedError {
    SharedError::NotAnInteger {
        field: field.to_string(),
        input: input.to_string(),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse `saveData` text that must hold a JSON object
pub fn parse_save_data(raw: &str) -> SharedResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(SharedError::InvalidPassthrough),
    }
}

/// `saveData` that is not a JSON object becomes `{}`
pub fn lenient_save_data(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    parse_save_data(raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring saveData: {}", e);
        Map::new()
    })
}

/// Query string carrying the session id
#[derive(Debug, Clone, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl SessionQuery {
    pub fn session_id(&self) -> SharedResult<SessionId> {
        SessionId::parse_uuid(self.session_id.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub successfully: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub uptime_seconds: u64,
    pub timestamp: String,
}
