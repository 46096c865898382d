//! Shared error types for the question generation system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Target item count must be at least 1, got {value}")]
    InvalidTargetCount { value: i64 },

    #[error("Unknown item kind: {input}")]
    UnknownItemKind { input: String },

    #[error("Unknown language: {input}")]
    UnknownLanguage { input: String },

    #[error("Difficulty level must be within 1..=5, got {value}")]
    DifficultyOutOfRange { value: i64 },

    #[error("Invalid session id: {input}")]
    InvalidSessionId { input: String },

    #[error("Field {field} must be an integer, got {input:?}")]
    NotAnInteger { field: String, input: String },

    #[error("Pass-through payload must be a JSON object")]
    InvalidPassthrough,
}

pub type SharedResult<T> = Result<T, SharedError>;
