//! Job status as seen by pollers.

use serde::{Deserialize, Serialize};

use crate::result::JobResult;
use crate::types::JobId;

/// Queue-side bookkeeping for a job that has no stored result yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeState {
    /// Enqueued, not yet picked up.
    Pending,
    /// A worker is executing it.
    Running,
    /// The worker finished and attempted to publish and persist.
    Done,
    /// Execution crashed before any result could be captured.
    Failed,
}

impl RuntimeState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Response body for `GET /api/v1/jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}
