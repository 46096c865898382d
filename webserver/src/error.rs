//! WebServer-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use generator::{ExtractionError, GeneratorError};
use serde_json::json;
use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error("Missing form field: {field}")]
    MissingField { field: &'static str },

    #[error("Unsupported file type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    #[error("File exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    Validation(#[from] SharedError),

    #[error("Invalid document: {0}")]
    Document(#[from] ExtractionError),

    #[error("Generation error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WebServerError {
    pub fn invalid(details: impl Into<String>) -> Self {
        Self::InvalidRequest {
            details: details.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebServerError::InvalidRequest { .. }
            | WebServerError::MissingField { .. }
            | WebServerError::UnsupportedMediaType { .. }
            | WebServerError::Validation(_)
            | WebServerError::Document(_) => StatusCode::BAD_REQUEST,
            WebServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WebServerError::Generator(err) => match err {
                GeneratorError::InvalidRequest(_)
                | GeneratorError::EmptyDocument
                | GeneratorError::Document(_) => StatusCode::BAD_REQUEST,
                GeneratorError::ConfigError { .. } | GeneratorError::JoinError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            WebServerError::ConfigError { .. }
            | WebServerError::ServerStartup(_)
            | WebServerError::IoError(_)
            | WebServerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
