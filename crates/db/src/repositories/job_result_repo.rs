//! Repository for the `job_results` table.

use scenegen_core::result::JobResult;
use scenegen_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::job_result::JobResultRow;

/// Column list for `job_results` SELECT queries.
const COLUMNS: &str = "job_id, result, created_at, expires_at";

/// Provides query operations for stored job results.
pub struct JobResultRepo;

impl JobResultRepo {
    /// Insert or replace the result for `result.job_id`.
    pub async fn upsert(
        pool: &PgPool,
        result: &JobResult,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO job_results (job_id, result, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (job_id) DO UPDATE \
             SET result = EXCLUDED.result, \
                 created_at = NOW(), \
                 expires_at = EXCLUDED.expires_at",
        )
        .bind(&result.job_id)
        .bind(Json(result))
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch an unexpired result by job id.
    pub async fn find_live(
        pool: &PgPool,
        job_id: &str,
    ) -> Result<Option<JobResultRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_results WHERE job_id = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, JobResultRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every expired row. Returns the number of rows removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_results WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
