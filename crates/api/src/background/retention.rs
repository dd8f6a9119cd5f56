//! Periodic cleanup of expired job results and finished queue bookkeeping.
//!
//! Runs on a fixed interval using `tokio::time::interval` until cancelled.

use std::sync::Arc;
use std::time::Duration;

use scenegen_core::store::ResultStore;
use scenegen_worker::TaskQueue;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the retention cleanup loop.
///
/// Each tick purges expired results from `store` and forgets queue
/// bookkeeping for jobs finished more than `retention` ago.
pub async fn run(
    store: Arc<dyn ResultStore>,
    queue: Arc<TaskQueue>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = interval.as_secs(),
        "Result retention job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result retention job stopping");
                break;
            }
            _ = ticker.tick() => sweep(store.as_ref(), &queue, retention).await,
        }
    }
}

/// One cleanup pass.
pub async fn sweep(store: &dyn ResultStore, queue: &TaskQueue, retention: Duration) {
    match store.purge_expired().await {
        Ok(0) => tracing::debug!("Result retention: no results to purge"),
        Ok(deleted) => tracing::info!(deleted, "Result retention: purged expired results"),
        Err(e) => tracing::error!(error = %e, "Result retention: cleanup failed"),
    }

    let forgotten = queue.purge_finished(retention);
    if forgotten > 0 {
        tracing::debug!(forgotten, "Result retention: dropped finished job states");
    }
}
