use std::net::SocketAddr;
use std::sync::Arc;

use scenegen_core::store::{MemoryResultStore, ResultStore};
use scenegen_events::EventBus;
use scenegen_providers::{ProviderConfig, Providers};
use scenegen_worker::pool::SHUTDOWN_GRACE;
use scenegen_worker::{TaskQueue, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenegen_api::background::retention;
use scenegen_api::config::ServerConfig;
use scenegen_api::router::build_app_router;
use scenegen_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scenegen_api=debug,scenegen_worker=debug,scenegen_providers=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let provider_config = ProviderConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        workers = config.worker_count,
        "Loaded server configuration",
    );

    // --- Result store ---
    let result_store = build_result_store(&config).await;

    // --- Queue, event bus, workers ---
    let queue = Arc::new(TaskQueue::new());
    let event_bus = EventBus::default();

    let pool = WorkerPool::spawn(
        config.worker_count,
        Arc::clone(&queue),
        Arc::new(event_bus.clone()),
        Arc::clone(&result_store),
        |_| Providers::new(provider_config.clone()),
    );

    // --- Retention sweeper ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(retention::run(
        Arc::clone(&result_store),
        Arc::clone(&queue),
        config.result_retention(),
        retention::CLEANUP_INTERVAL,
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        queue: Arc::clone(&queue),
        event_bus: event_bus.clone(),
        result_store,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown_bus = event_bus.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open event streams would otherwise keep their connections alive.
            shutdown_bus.close_all();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    pool.shutdown(SHUTDOWN_GRACE).await;

    retention_cancel.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, retention_handle).await;
    tracing::info!("Retention job stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-process store.
async fn build_result_store(config: &ServerConfig) -> Arc<dyn ResultStore> {
    let retention = config.result_retention();

    let Some(database_url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set, using in-memory result store");
        return Arc::new(MemoryResultStore::new(retention));
    };

    let pool = scenegen_db::create_pool(database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    scenegen_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    scenegen_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    Arc::new(scenegen_db::PgResultStore::new(pool, retention))
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
