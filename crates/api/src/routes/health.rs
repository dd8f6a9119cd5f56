use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configured number of background workers.
    pub workers: usize,
    /// Jobs accepted but not yet picked up.
    pub queue_depth: usize,
}

/// GET /health -- returns service status and queue load.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.queue.is_closed() {
        "shutting_down"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        workers: state.config.worker_count,
        queue_depth: state.queue.depth(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
