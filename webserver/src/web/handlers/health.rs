//! Liveness endpoint

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use generator::GenerationBackend;

use crate::state::AppState;
use crate::types::HealthResponse;

/// GET /health
pub async fn health<B: GenerationBackend + 'static>(State(state): State<AppState<B>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        sessions: state.registry().len().await,
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
