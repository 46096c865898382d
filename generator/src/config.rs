//! Generator configuration

use std::env;
use std::time::Duration;

use crate::error::{GeneratorError, GeneratorResult};

pub const DEFAULT_MAX_PAGES_PER_CHUNK: usize = 3;
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_PARSE_RETRIES: u32 = 3;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Upper bounds applied by the chunk planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerLimits {
    pub max_pages_per_chunk: usize,
    pub max_concurrency: usize,
}

impl Default for PlannerLimits {
    fn default() -> Self {
        Self {
            max_pages_per_chunk: DEFAULT_MAX_PAGES_PER_CHUNK,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Pipeline behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub limits: PlannerLimits,
    /// Extra attempts after an unparseable backend reply
    pub parse_retries: u32,
    /// Cancel a run after this many consecutive backend failures
    pub backend_failure_threshold: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            limits: PlannerLimits::default(),
            parse_retries: DEFAULT_PARSE_RETRIES,
            backend_failure_threshold: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> GeneratorResult<()> {
        if self.limits.max_pages_per_chunk == 0 {
            return Err(GeneratorError::ConfigError {
                message: "max_pages_per_chunk must be at least 1".to_string(),
            });
        }
        if self.limits.max_concurrency == 0 {
            return Err(GeneratorError::ConfigError {
                message: "max_concurrency must be at least 1".to_string(),
            });
        }
        if self.backend_failure_threshold == Some(0) {
            return Err(GeneratorError::ConfigError {
                message: "backend_failure_threshold must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Session channel sizing and eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Events a live subscriber may fall behind before it starts skipping
    pub broadcast_capacity: usize,
    /// Events kept for a session that has no subscriber yet
    pub backlog_capacity: usize,
    /// Idle time after which an unused session is evicted
    pub idle_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            backlog_capacity: 256,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// Gemini backend connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }

    /// Load settings from the process environment
    pub fn from_env() -> GeneratorResult<Self> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GeneratorError::ConfigError {
                message: format!("{API_KEY_ENV} must be set"),
            })?;

        let mut config = Self::new(api_key);
        if let Ok(model) = env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }
        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
