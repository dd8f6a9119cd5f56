//! Fixed-size pool of workers sharing one queue.

use std::sync::Arc;
use std::time::Duration;

use scenegen_core::store::ResultStore;
use scenegen_events::EventPublisher;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::executor::{JobExecutor, Worker};
use crate::queue::TaskQueue;

/// How long shutdown waits for each worker to finish its current job.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers. `make_executor` is called once per worker
    /// with its index, so every worker owns its own executor.
    pub fn spawn<E, F>(
        count: usize,
        queue: Arc<TaskQueue>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn ResultStore>,
        make_executor: F,
    ) -> Self
    where
        E: JobExecutor + 'static,
        F: Fn(usize) -> E,
    {
        let cancel = CancellationToken::new();
        let handles = (0..count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&queue),
                    Arc::clone(&publisher),
                    Arc::clone(&store),
                    make_executor(id),
                );
                tokio::spawn(worker.run(cancel.child_token()))
            })
            .collect();

        tracing::info!(count, "Worker pool started");
        Self {
            queue,
            cancel,
            handles,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Close the queue, cancel every worker and wait up to `grace` for each.
    pub async fn shutdown(self, grace: Duration) {
        tracing::info!("Shutting down worker pool");
        self.queue.close();
        self.cancel.cancel();

        for (id, handle) in self.handles.into_iter().enumerate() {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(worker_id = id, error = %e, "Worker task failed"),
                Err(_) => tracing::warn!(worker_id = id, "Worker did not stop in time"),
            }
        }

        tracing::info!("Worker pool shut down complete");
    }
}
