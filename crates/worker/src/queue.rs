//! In-process multi-consumer job queue with runtime bookkeeping.
//!
//! Jobs travel through an unbounded mpsc channel whose receiver is shared
//! behind a mutex, so each job reaches exactly one worker. Alongside the
//! channel the queue tracks a [`RuntimeState`] per job id, which the status
//! endpoint falls back on while no result is stored.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use scenegen_core::job::Job;
use scenegen_core::status::RuntimeState;
use scenegen_core::store::retention_delta;
use scenegen_core::types::{JobId, Timestamp};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    /// The id belongs to a job that is tracked or has a stored result.
    #[error("Job id {0} is already in use")]
    Conflict(JobId),

    /// The queue no longer accepts work.
    #[error("Task queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct StateEntry {
    state: RuntimeState,
    updated_at: Timestamp,
}

impl StateEntry {
    fn now(state: RuntimeState) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
        }
    }
}

pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Job>,
    receiver: Mutex<mpsc::UnboundedReceiver<Job>>,
    states: RwLock<HashMap<JobId, StateEntry>>,
    closed: CancellationToken,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            states: RwLock::new(HashMap::new()),
            closed: CancellationToken::new(),
        }
    }

    /// Accept a job for execution and mark it `Pending`.
    ///
    /// Ids are single-use: any id the queue still has bookkeeping for,
    /// finished or not, is refused until [`purge_finished`](Self::purge_finished)
    /// forgets it.
    pub fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        if states.contains_key(&job.id) {
            return Err(QueueError::Conflict(job.id));
        }

        let job_id = job.id.clone();
        states.insert(job_id.clone(), StateEntry::now(RuntimeState::Pending));
        if self.sender.send(job).is_err() {
            states.remove(&job_id);
            return Err(QueueError::Closed);
        }
        tracing::debug!(job_id = %job_id, "Job enqueued");
        Ok(())
    }

    /// Wait for the next job and mark it `Running`.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn dequeue(&self) -> Option<Job> {
        let mut receiver = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return None,
            receiver = self.receiver.lock() => receiver,
        };
        let job = tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            job = receiver.recv() => job,
        }?;
        drop(receiver);

        self.set_state(&job.id, RuntimeState::Running);
        Some(job)
    }

    pub fn runtime_state(&self, job_id: &str) -> Option<RuntimeState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .map(|entry| entry.state)
    }

    /// The worker finished the job (result published and persisted, or
    /// attempted to be).
    pub fn mark_done(&self, job_id: &str) {
        self.set_state(job_id, RuntimeState::Done);
    }

    /// Execution crashed before a result could be captured.
    pub fn mark_failed(&self, job_id: &str) {
        self.set_state(job_id, RuntimeState::Failed);
    }

    /// Number of jobs accepted but not yet picked up.
    pub fn depth(&self) -> usize {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| entry.state == RuntimeState::Pending)
            .count()
    }

    /// Stop accepting and delivering jobs. Jobs still queued are dropped.
    pub fn close(&self) {
        self.closed.cancel();
        tracing::info!("Task queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Forget finished jobs last updated more than `older_than` ago.
    /// Returns how many entries were removed.
    pub fn purge_finished(&self, older_than: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(retention_delta(older_than)) else {
            return 0;
        };
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let before = states.len();
        states.retain(|_, entry| !(entry.state.is_finished() && entry.updated_at <= cutoff));
        before - states.len()
    }

    fn set_state(&self, job_id: &str, state: RuntimeState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.to_string(), StateEntry::now(state));
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
