/// Job identifiers are opaque strings, either client-supplied or a
/// generated UUID v4.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh job id.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4().to_string()
}
