//! Job status resolution for polling clients.
//!
//! A stored [`JobResult`](scenegen_core::result::JobResult) always wins.
//! Without one, the queue's runtime bookkeeping decides:
//!
//! | stored result | runtime state      | reported    |
//! |---------------|--------------------|-------------|
//! | yes           | any                | `completed` |
//! | no            | `Pending` / absent | `pending`   |
//! | no            | `Running`          | `running`   |
//! | no            | `Failed`           | `failed`    |
//! | no            | `Done`             | `running`   |
//!
//! `Done` without a result means persisting failed or the result expired;
//! the outcome is unknown, so the job is not reported as finished.

use std::sync::Arc;

use scenegen_core::status::{JobStatus, JobStatusView, RuntimeState};
use scenegen_core::store::{ResultStore, StoreError};
use scenegen_worker::TaskQueue;

pub struct StatusResolver {
    queue: Arc<TaskQueue>,
    store: Arc<dyn ResultStore>,
}

impl StatusResolver {
    pub fn new(queue: Arc<TaskQueue>, store: Arc<dyn ResultStore>) -> Self {
        Self { queue, store }
    }

    pub async fn get_status(&self, job_id: &str) -> Result<JobStatusView, StoreError> {
        if let Some(result) = self.store.get(job_id).await? {
            return Ok(JobStatusView {
                job_id: job_id.to_string(),
                status: JobStatus::Completed,
                result: Some(result),
            });
        }

        let status = match self.queue.runtime_state(job_id) {
            None | Some(RuntimeState::Pending) => JobStatus::Pending,
            Some(RuntimeState::Running) | Some(RuntimeState::Done) => JobStatus::Running,
            Some(RuntimeState::Failed) => JobStatus::Failed,
        };

        Ok(JobStatusView {
            job_id: job_id.to_string(),
            status,
            result: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use scenegen_core::job::{Job, JobKind, JobSpec};
    use scenegen_core::result::JobResult;
    use scenegen_core::store::MemoryResultStore;

    use super::*;

    fn job(id: &str) -> Job {
        Job {
            id: id.into(),
            kind: JobKind::TextPrompt,
            spec: JobSpec::from_prompt("hi"),
            created_at: Utc::now(),
        }
    }

    fn resolver() -> (StatusResolver, Arc<TaskQueue>, Arc<MemoryResultStore>) {
        let queue = Arc::new(TaskQueue::new());
        let store = Arc::new(MemoryResultStore::default());
        let resolver = StatusResolver::new(Arc::clone(&queue), store.clone());
        (resolver, queue, store)
    }

    #[tokio::test]
    async fn unknown_job_is_pending() {
        let (resolver, _, _) = resolver();
        let view = resolver.get_status("nope").await.unwrap();
        assert_eq!(view.status, JobStatus::Pending);
        assert!(view.result.is_none());
    }

    #[tokio::test]
    async fn runtime_states_map_to_statuses() {
        let (resolver, queue, _) = resolver();
        queue.enqueue(job("a")).unwrap();
        assert_eq!(resolver.get_status("a").await.unwrap().status, JobStatus::Pending);

        queue.dequeue().await.unwrap();
        assert_eq!(resolver.get_status("a").await.unwrap().status, JobStatus::Running);

        queue.mark_failed("a");
        assert_eq!(resolver.get_status("a").await.unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn done_without_result_stays_running() {
        let (resolver, queue, _) = resolver();
        queue.enqueue(job("a")).unwrap();
        queue.dequeue().await.unwrap();
        queue.mark_done("a");

        assert_eq!(resolver.get_status("a").await.unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn stored_error_result_is_completed() {
        let (resolver, _, store) = resolver();
        let result = JobResult::failure("a", "boom", "ApiError");
        store.put(&result).await.unwrap();

        let view = resolver.get_status("a").await.unwrap();
        assert_eq!(view.status, JobStatus::Completed);
        assert_eq!(view.result, Some(result));
    }
}
