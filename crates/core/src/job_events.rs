//! Job lifecycle events pushed to live subscribers.
//!
//! Every job emits exactly one `start` followed by at most one terminal
//! event (`complete` or `error`). Events are transient: they only reach
//! subscribers attached at publish time.

use serde::{Deserialize, Serialize};

use crate::result::JobResult;
use crate::types::JobId;

/// Event name for a job that a worker has picked up.
pub const EVENT_START: &str = "start";

/// Event name for a job that finished successfully.
pub const EVENT_COMPLETE: &str = "complete";

/// Event name for a job that failed.
pub const EVENT_ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Complete,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => EVENT_START,
            Self::Complete => EVENT_COMPLETE,
            Self::Error => EVENT_ERROR,
        }
    }

    /// `complete` and `error` end a job's event sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl JobEvent {
    pub fn start(job_id: impl Into<JobId>) -> Self {
        let job_id = job_id.into();
        let payload = serde_json::json!({ "status": "started", "job_id": job_id });
        Self {
            job_id,
            kind: EventKind::Start,
            payload,
        }
    }

    /// The terminal event matching a result: `complete` for success,
    /// `error` otherwise.
    pub fn terminal(result: &JobResult) -> Self {
        let kind = if result.is_success() {
            EventKind::Complete
        } else {
            EventKind::Error
        };
        Self {
            job_id: result.job_id.clone(),
            kind,
            payload: result.to_payload(),
        }
    }

    /// An `error` event carrying a fault detail that did not come from a
    /// worker (e.g. the stream itself broke).
    pub fn fault(job_id: impl Into<JobId>, error: impl Into<String>, error_type: &str) -> Self {
        Self::terminal(&JobResult::failure(job_id, error, error_type))
    }

    /// Wire form pushed to clients: `{"event": .., "data": ..}`.
    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "event": self.kind.as_str(),
            "data": self.payload,
        })
    }
}
