//! Main webserver implementation
//!
//! Wires the generation pipeline into an axum router and owns the
//! background session sweeper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use generator::{GenerationBackend, SessionRegistry};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::web::handlers::{documents, health};

/// Slack on top of the file limit for the text fields of a multipart body
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Main webserver struct with dependency injection
pub struct WebServer<B: GenerationBackend + 'static> {
    state: AppState<B>,
}

impl<B: GenerationBackend + 'static> WebServer<B> {
    pub fn new(state: AppState<B>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState<B> {
        &self.state
    }

    /// Build the axum router with all routes
    pub fn build_router(&self) -> Router {
        let config = &self.state.config;

        let router = Router::new()
            .route("/documents/upload", post(documents::upload::<B>))
            .route("/documents/stream", get(documents::stream::<B>))
            .route("/documents/cancel", post(documents::cancel::<B>))
            .route("/health", get(health::health::<B>));

        let router = match &config.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .layer(DefaultBodyLimit::max(config.max_upload_bytes + FORM_OVERHEAD_BYTES)),
            )
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` completes
    pub async fn run<F>(&self, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.state.config.bind_address;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {}: {}", address, e)))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = Arc::clone(&self.state.config);
        let router = self.build_router();
        let stop = self.state.shutdown.clone();

        let registry = Arc::clone(self.state.registry());
        let idle_ttl = registry.config().idle_ttl;
        let sweeper = spawn_session_sweeper(registry, idle_ttl, config.sweep_interval, stop.clone());

        info!("Web server listening on http://{}", listener.local_addr()?);
        if let Some(dir) = &config.static_dir {
            info!("Serving static files from {}", dir.display());
        }

        // open event streams end once the token fires, letting connections drain
        let signal_stop = stop.clone();
        let signal = async move {
            shutdown.await;
            signal_stop.cancel();
        };

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await;

        stop.cancel();
        if let Err(e) = sweeper.await {
            error!("Session sweeper failed: {}", e);
        }

        result.map_err(WebServerError::from)
    }
}

/// Periodically evict idle sessions until `shutdown` fires
pub fn spawn_session_sweeper(
    registry: Arc<SessionRegistry>,
    ttl: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = registry.evict_idle(ttl).await;
                    if evicted > 0 {
                        let remaining = registry.len().await;
                        info!(evicted, remaining, "Evicted idle sessions");
                    } else {
                        debug!("Session sweep found nothing to evict");
                    }
                }
            }
        }
    })
}
