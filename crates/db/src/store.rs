//! [`ResultStore`] backed by the `job_results` table.

use std::time::Duration;

use async_trait::async_trait;
use scenegen_core::result::JobResult;
use scenegen_core::store::{expiry_after, retention_delta, ResultStore, StoreError};

use crate::repositories::JobResultRepo;
use crate::DbPool;

pub struct PgResultStore {
    pool: DbPool,
    retention: chrono::Duration,
}

impl PgResultStore {
    pub fn new(pool: DbPool, retention: Duration) -> Self {
        Self {
            pool,
            retention: retention_delta(retention),
        }
    }
}

fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(e.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn put(&self, result: &JobResult) -> Result<(), StoreError> {
        let expires_at = expiry_after(self.retention);
        JobResultRepo::upsert(&self.pool, result, expires_at)
            .await
            .map_err(store_error)
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobResult>, StoreError> {
        let row = JobResultRepo::find_live(&self.pool, job_id)
            .await
            .map_err(store_error)?;
        Ok(row.map(|r| r.into_result()))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let deleted = JobResultRepo::delete_expired(&self.pool)
            .await
            .map_err(store_error)?;
        if deleted > 0 {
            tracing::debug!(deleted, "Purged expired job results");
        }
        Ok(deleted)
    }
}
