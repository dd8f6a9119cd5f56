pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                    submit (POST)
/// /jobs/{id}               status (GET)
/// /jobs/{id}/events        live events, Server-Sent Events (GET)
/// /jobs/{id}/ws            live events, WebSocket (GET)
/// /queue/{kind}            submit with the kind in the path (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/queue", jobs::queue_router())
}
