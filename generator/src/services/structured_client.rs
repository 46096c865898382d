//! Structured-output client with parse-retry on top of a generation backend

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DEFAULT_PARSE_RETRIES;
use crate::core::processor::unwrap_singleton;
use crate::error::GenerationError;
use crate::traits::GenerationBackend;
use crate::types::ContentRequest;

/// Calls the backend and parses its reply as JSON, retrying unparseable replies
pub struct StructuredClient<B: GenerationBackend> {
    backend: Arc<B>,
    parse_retries: u32,
}

impl<B: GenerationBackend> StructuredClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_parse_retries(backend, DEFAULT_PARSE_RETRIES)
    }

    pub fn with_parse_retries(backend: Arc<B>, parse_retries: u32) -> Self {
        Self {
            backend,
            parse_retries,
        }
    }

    /// Total attempts made before giving up on unparseable output
    pub fn max_attempts(&self) -> u32 {
        self.parse_retries + 1
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Generate and parse a reply
    ///
    /// Backend failures are returned at once; only malformed output is
    /// retried. A single-element array is collapsed to its element.
    pub async fn generate(&self, request: &ContentRequest) -> Result<Value, GenerationError> {
        let max_attempts = self.max_attempts();

        for attempt in 1..=max_attempts {
            let text = self
                .backend
                .generate_content(request)
                .await
                .map_err(|reason| GenerationError::Backend { reason })?;

            match serde_json::from_str::<Value>(&text) {
                Ok(value) => {
                    debug!(attempt, pages = ?request.payload.pages, "Parsed structured reply");
                    return Ok(unwrap_singleton(value));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        pages = ?request.payload.pages,
                        "Unparseable backend reply: {}",
                        e
                    );
                }
            }
        }

        Err(GenerationError::Parse {
            attempts: max_attempts,
        })
    }
}
