//! Generator trait definitions for dependency injection

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::{ApiFailure, ChunkPayload, ContentRequest};

/// Produces self-contained sub-documents from a loaded source document
#[mockall::automock]
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    /// Number of pages in the source document
    fn page_count(&self) -> usize;

    /// Build a sub-document holding exactly `pages` (0-based, ascending)
    async fn extract(&self, pages: &[usize]) -> Result<ChunkPayload, ExtractionError>;
}

/// Structured-output generation backend
#[mockall::automock]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send one request and return the raw reply text
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, ApiFailure>;
}
