//! Generator error types

use shared::SharedError;
use thiserror::Error;

use crate::types::ApiFailure;

/// Result type for generator operations
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// A page selection could not be materialized as a sub-document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Source is not a valid document: {message}")]
    InvalidDocument { message: String },

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Page index {index} requested more than once")]
    DuplicatePage { index: usize },

    #[error("No pages requested")]
    EmptySelection,

    #[error("Failed to serialize chunk: {message}")]
    Serialization { message: String },

    #[error("Extraction task failed: {message}")]
    TaskFailed { message: String },
}

/// The generation call for one chunk failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Backend output did not match the response contract after {attempts} attempts")]
    Parse { attempts: u32 },

    #[error("Generation backend failed: {reason:?}")]
    Backend { reason: ApiFailure },
}

/// Why a chunk contributed no items
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl ChunkError {
    /// True when the backend itself failed (network, auth, quota)
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, ChunkError::Generation(GenerationError::Backend { .. }))
    }
}

/// Run-level generator errors, surfaced synchronously to the caller
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] SharedError),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Document error: {0}")]
    Document(#[from] ExtractionError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
