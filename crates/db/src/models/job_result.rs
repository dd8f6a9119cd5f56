//! Row model for the `job_results` table.

use scenegen_core::result::JobResult;
use scenegen_core::types::{JobId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `job_results` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobResultRow {
    pub job_id: JobId,
    pub result: Json<JobResult>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl JobResultRow {
    pub fn into_result(self) -> JobResult {
        self.result.0
    }
}
