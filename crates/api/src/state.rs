use std::sync::Arc;

use scenegen_core::store::ResultStore;
use scenegen_events::EventBus;
use scenegen_worker::TaskQueue;

use crate::config::ServerConfig;
use crate::status::StatusResolver;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Queue feeding the worker pool.
    pub queue: Arc<TaskQueue>,
    /// Per-job live event fan-out.
    pub event_bus: EventBus,
    /// Terminal job results.
    pub result_store: Arc<dyn ResultStore>,
}

impl AppState {
    pub fn status_resolver(&self) -> StatusResolver {
        StatusResolver::new(Arc::clone(&self.queue), Arc::clone(&self.result_store))
    }
}
