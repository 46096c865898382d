//! Gemini structured-output backend over the REST API

use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{GeneratorError, GeneratorResult};
use crate::traits::GenerationBackend;
use crate::types::{ApiFailure, ContentRequest};

/// Real Gemini backend
pub struct GeminiBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl GeminiBackend {
    pub fn new(config: BackendConfig) -> GeneratorResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| GeneratorError::ConfigError {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(request: &ContentRequest) -> Value {
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        { "text": request.prompt },
                        {
                            "inline_data": {
                                "mime_type": request.payload.mime_type,
                                "data": STANDARD.encode(&request.payload.data),
                            }
                        }
                    ]
                }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        })
    }
}

/// Map a non-success status to a failure reason
fn classify_status(status: reqwest::StatusCode, body: &str) -> ApiFailure {
    match status.as_u16() {
        400 => ApiFailure::InvalidRequest(body.to_string()),
        401 | 403 => ApiFailure::AuthenticationFailed,
        404 => ApiFailure::ModelUnavailable(body.to_string()),
        429 => ApiFailure::RateLimitExceeded,
        503 => ApiFailure::ServiceUnavailable,
        _ => ApiFailure::ServerError(status.to_string()),
    }
}

/// Text of the first candidate part
fn candidate_text(response: &Value) -> Option<&str> {
    response
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String, ApiFailure> {
        let request_start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiFailure::Timeout
                } else {
                    ApiFailure::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiFailure::Timeout
            } else {
                ApiFailure::InvalidRequest(format!("Failed to parse response: {}", e))
            }
        })?;

        let text = candidate_text(&response_json).ok_or(ApiFailure::EmptyResponse)?;

        debug!(
            model = %self.config.model,
            pages = ?request.payload.pages,
            elapsed_ms = request_start.elapsed().as_millis() as u64,
            "Gemini request completed"
        );
        Ok(text.to_string())
    }
}
