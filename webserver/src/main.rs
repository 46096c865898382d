//! WebServer entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use generator::{
    BackendConfig, GeminiBackend, GenerationPipeline, PipelineConfig, SessionConfig,
    SessionRegistry,
};
use shared::logging;
use tokio::signal;

use webserver::{AppState, ServerConfig, WebServer, WebServerError, WebServerResult};

const COMPONENT: &str = "webserver";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "Generates quiz questions from uploaded PDF documents")]
struct Args {
    /// Port for HTTP server
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Static files directory served at the root path
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Gemini model name (overrides GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Gemini API base URL (overrides GEMINI_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Per-request timeout for backend calls; unset means no timeout
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Idle time before an unused session is evicted
    #[arg(long, default_value = "1800")]
    session_ttl_secs: u64,

    /// How often idle sessions are swept
    #[arg(long, default_value = "60")]
    sweep_interval_secs: u64,

    /// Largest accepted upload in MiB
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,
}

impl Args {
    fn server_config(&self) -> WebServerResult<ServerConfig> {
        let bind_address: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| WebServerError::config(format!("Invalid bind address: {}", e)))?;

        Ok(ServerConfig {
            bind_address,
            static_dir: self.static_dir.clone(),
            max_upload_bytes: self.max_upload_mb.max(1) * 1024 * 1024,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
        })
    }

    fn backend_config(&self) -> WebServerResult<BackendConfig> {
        let mut config = BackendConfig::from_env()
            .map_err(|e| WebServerError::config(e.to_string()))?
            .with_request_timeout(self.request_timeout_secs.map(Duration::from_secs));

        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(base_url) = &self.api_base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    logging::init_tracing(COMPONENT, Some(&args.log_level));

    let server_config = args.server_config()?;
    let backend_config = args.backend_config()?;

    logging::log_startup(
        COMPONENT,
        &format!(
            "http://{} (model {}, upload limit {} MiB)",
            server_config.bind_address, backend_config.model, args.max_upload_mb
        ),
    );

    let backend = GeminiBackend::new(backend_config)?;
    let registry = Arc::new(SessionRegistry::new(SessionConfig {
        idle_ttl: Duration::from_secs(args.session_ttl_secs),
        ..SessionConfig::default()
    }));
    let pipeline = GenerationPipeline::new(registry, Arc::new(backend), PipelineConfig::default())?;

    let webserver = WebServer::new(AppState::new(pipeline, server_config));

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => logging::log_shutdown(COMPONENT, "Received Ctrl+C signal"),
            Err(err) => logging::log_error(COMPONENT, "Signal handling", &err),
        }
    };

    webserver.run(shutdown).await?;

    logging::log_shutdown(COMPONENT, "WebServer stopped gracefully");
    Ok(())
}
