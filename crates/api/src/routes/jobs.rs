//! Route definitions for the `/jobs` and `/queue` resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                -> submit_job
/// GET    /{id}            -> get_job
/// GET    /{id}/events     -> job_events
/// GET    /{id}/ws         -> job_ws_handler
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/events", get(jobs::job_events))
        .route("/{id}/ws", get(ws::job_ws_handler))
}

/// Routes mounted at `/queue`.
///
/// ```text
/// POST   /{kind}          -> submit_to_queue
/// ```
pub fn queue_router() -> Router<AppState> {
    Router::new().route("/{kind}", post(jobs::submit_to_queue))
}
