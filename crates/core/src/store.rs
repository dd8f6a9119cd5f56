//! Terminal-result store contract and the in-memory implementation.
//!
//! The store is the authoritative record of how a job ended. Writes are
//! last-write-wins per job id and entries expire after a bounded retention
//! window: it answers "what happened to my recent job", it is not an
//! archive.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::result::JobResult;
use crate::types::Timestamp;

/// Default retention for stored results: one hour.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Errors from a result store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation.
    #[error("Result store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Result store serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store (or overwrite) the result for `result.job_id`.
    async fn put(&self, result: &JobResult) -> Result<(), StoreError>;

    /// Fetch an unexpired result.
    async fn get(&self, job_id: &str) -> Result<Option<JobResult>, StoreError>;

    /// Delete expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

struct StoredResult {
    result: JobResult,
    expires_at: Timestamp,
}

/// Convert a retention window for timestamp arithmetic. Windows too large
/// for chrono saturate instead of failing.
pub fn retention_delta(retention: Duration) -> chrono::Duration {
    chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX)
}

/// When a result written now stops being served. Saturates at the latest
/// representable instant.
pub fn expiry_after(retention: chrono::Duration) -> Timestamp {
    Utc::now()
        .checked_add_signed(retention)
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
}

/// Process-local result store with per-entry expiry.
pub struct MemoryResultStore {
    entries: RwLock<HashMap<String, StoredResult>>,
    retention: chrono::Duration,
}

impl MemoryResultStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention: retention_delta(retention),
        }
    }

    /// Number of entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put(&self, result: &JobResult) -> Result<(), StoreError> {
        let stored = StoredResult {
            result: result.clone(),
            expires_at: expiry_after(self.retention),
        };
        self.entries
            .write()
            .await
            .insert(result.job_id.clone(), stored);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobResult>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .await
            .get(job_id)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.result.clone()))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| stored.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}
