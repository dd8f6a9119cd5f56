/// Errors raised while turning a submission into a job.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported job kind: {0}")]
    UnsupportedKind(String),
}
