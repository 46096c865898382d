//! Shared handler state

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use generator::{GenerationBackend, GenerationPipeline, SessionRegistry};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Settings of the HTTP process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// State handed to every handler
pub struct AppState<B: GenerationBackend + 'static> {
    pub pipeline: GenerationPipeline<B>,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
    /// Fired when the server starts shutting down; ends open event streams
    pub shutdown: CancellationToken,
}

impl<B: GenerationBackend + 'static> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            config: Arc::clone(&self.config),
            started_at: self.started_at,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<B: GenerationBackend + 'static> AppState<B> {
    pub fn new(pipeline: GenerationPipeline<B>, config: ServerConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.pipeline.registry()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
