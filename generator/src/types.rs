//! Generator-specific data types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::planner::ChunkPlan;
use crate::error::ChunkError;

/// Failure reasons for generation backend requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiFailure {
    /// Authentication failed (invalid or missing API key)
    AuthenticationFailed,
    /// Rate limit exceeded
    RateLimitExceeded,
    /// Invalid request format or parameters
    InvalidRequest(String),
    /// Model not found or unavailable
    ModelUnavailable(String),
    /// Network/connection error
    NetworkError(String),
    /// Server error from provider
    ServerError(String),
    /// Request timeout
    Timeout,
    /// Service temporarily unavailable
    ServiceUnavailable,
    /// Reply carried no candidate text
    EmptyResponse,
}

/// A self-contained sub-document ready to send to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Source page indices (0-based) contained in `data`
    pub pages: Vec<usize>,
}

impl ChunkPayload {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, pages: Vec<usize>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            pages,
        }
    }
}

/// One structured-output call against the backend
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub prompt: String,
    pub payload: ChunkPayload,
    pub items_requested: usize,
    /// Declared response schema the backend must follow
    pub response_schema: Value,
}

/// Result of processing one bucket of pages
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub index: usize,
    pub pages: Vec<usize>,
    pub result: Result<Vec<Value>, ChunkError>,
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub plan: ChunkPlan,
    pub target: u32,
    pub generated: u32,
    pub dropped_chunks: u32,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn reached_target(&self) -> bool {
        self.generated >= self.target
    }
}
