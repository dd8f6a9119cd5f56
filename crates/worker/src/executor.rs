//! Single-job execution loop.
//!
//! A [`Worker`] pulls one job at a time from the [`TaskQueue`], publishes
//! `start`, runs the job through its [`JobExecutor`], then publishes the
//! terminal event and persists the result. No automatic retry is performed.
//!
//! A panicking executor gets an `error` event with error_type `Panic` and
//! the job is marked failed, but no result is stored for it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use scenegen_core::job::Job;
use scenegen_core::job_events::JobEvent;
use scenegen_core::result::{Completion, JobResult};
use scenegen_core::store::ResultStore;
use scenegen_events::EventPublisher;
use scenegen_providers::{ProviderError, Providers};
use tokio_util::sync::CancellationToken;

use crate::queue::TaskQueue;

/// `error_type` of the event published when an executor panics.
pub const PANIC_ERROR: &str = "Panic";

/// Turns a job into a completion. Owned by exactly one worker and called
/// sequentially.
#[async_trait]
pub trait JobExecutor: Send {
    async fn run_job(&mut self, job: &Job) -> Result<Completion, ProviderError>;
}

#[async_trait]
impl JobExecutor for Providers {
    async fn run_job(&mut self, job: &Job) -> Result<Completion, ProviderError> {
        self.execute(job.kind, &job.spec).await
    }
}

pub struct Worker<E> {
    id: usize,
    queue: Arc<TaskQueue>,
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn ResultStore>,
    executor: E,
}

impl<E: JobExecutor> Worker<E> {
    pub fn new(
        id: usize,
        queue: Arc<TaskQueue>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn ResultStore>,
        executor: E,
    ) -> Self {
        Self {
            id,
            queue,
            publisher,
            store,
            executor,
        }
    }

    /// Process jobs until `cancel` fires or the queue closes.
    ///
    /// Cancellation is only observed between jobs; a job in flight runs to
    /// completion.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(worker_id = self.id, "Worker started");

        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.queue.dequeue() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process(job).await;
        }

        tracing::info!(worker_id = self.id, "Worker stopped");
    }

    /// Execute one already-dequeued job.
    pub async fn process(&mut self, job: Job) {
        let started = std::time::Instant::now();
        tracing::info!(
            job_id = %job.id,
            worker_id = self.id,
            kind = %job.kind,
            "Job started",
        );
        publish(self.publisher.as_ref(), self.id, JobEvent::start(job.id.as_str())).await;

        let outcome = AssertUnwindSafe(self.executor.run_job(&job))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(completion)) => JobResult::success(job.id.as_str(), completion),
            Ok(Err(e)) => {
                tracing::warn!(
                    job_id = %job.id,
                    worker_id = self.id,
                    error_type = e.error_type(),
                    error = %e,
                    "Job failed",
                );
                JobResult::failure(job.id.as_str(), e.to_string(), e.error_type())
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job.id,
                    worker_id = self.id,
                    "Job execution panicked",
                );
                let fault = JobEvent::fault(job.id.as_str(), "Job execution panicked", PANIC_ERROR);
                publish(self.publisher.as_ref(), self.id, fault).await;
                self.queue.mark_failed(&job.id);
                return;
            }
        };

        publish(self.publisher.as_ref(), self.id, JobEvent::terminal(&result)).await;
        if let Err(e) = self.store.put(&result).await {
            tracing::error!(
                job_id = %job.id,
                worker_id = self.id,
                error = %e,
                "Failed to persist job result",
            );
        }
        self.queue.mark_done(&job.id);

        tracing::info!(
            job_id = %job.id,
            worker_id = self.id,
            success = result.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished",
        );
    }
}

/// Publish failures are logged and swallowed; the job is never re-run.
async fn publish(publisher: &dyn EventPublisher, worker_id: usize, event: JobEvent) {
    let kind = event.kind.as_str();
    match publisher.publish(event).await {
        Ok(receivers) => {
            tracing::debug!(worker_id, event = kind, receivers, "Event published");
        }
        Err(e) => {
            tracing::error!(worker_id, event = kind, error = %e, "Failed to publish event");
        }
    }
}
