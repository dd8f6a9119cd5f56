//! Terminal job outcomes.
//!
//! A [`JobResult`] serializes to exactly the payload clients receive in a
//! `complete` or `error` event and from the status endpoint:
//!
//! ```text
//! {"status":"success","content":..,"model":..,"usage":{..},"job_id":..}
//! {"status":"error","error":..,"error_type":..,"job_id":..}
//! ```

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Token accounting reported by a provider. Missing counters are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Build usage from optional counters; the total is derived when the
    /// provider does not report one.
    pub fn from_counts(input: Option<u64>, output: Option<u64>, total: Option<u64>) -> Self {
        let input_tokens = input.unwrap_or(0);
        let output_tokens = output.unwrap_or(0);
        Self {
            input_tokens,
            output_tokens,
            total_tokens: total.unwrap_or(input_tokens + output_tokens),
        }
    }
}

/// What a provider adapter produces for a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Success {
        content: String,
        model: String,
        usage: Usage,
    },
    Error {
        error: String,
        error_type: String,
    },
}

/// The terminal outcome of one job, written once by the worker that ran it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub job_id: JobId,
}

impl JobResult {
    pub fn success(job_id: impl Into<JobId>, completion: Completion) -> Self {
        Self {
            outcome: JobOutcome::Success {
                content: completion.content,
                model: completion.model,
                usage: completion.usage,
            },
            job_id: job_id.into(),
        }
    }

    pub fn failure(
        job_id: impl Into<JobId>,
        error: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            outcome: JobOutcome::Error {
                error: error.into(),
                error_type: error_type.into(),
            },
            job_id: job_id.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success { .. })
    }

    /// JSON form used as event payload and store value.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error": format!("Failed to serialize result: {e}"),
                "error_type": "SerializationError",
                "job_id": self.job_id,
            })
        })
    }
}
