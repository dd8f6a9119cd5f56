use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scenegen_core::error::CoreError;
use scenegen_core::store::StoreError;
use scenegen_worker::QueueError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds queue, store and
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses of the form `{"error": .., "code": ..}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `scenegen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The task queue refused the job.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The result store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::UnsupportedKind(kind) => (
                    StatusCode::BAD_REQUEST,
                    "UNSUPPORTED_KIND",
                    format!("Unsupported job kind: {kind}"),
                ),
            },

            // --- Queue errors ---
            AppError::Queue(QueueError::Conflict(_)) => {
                (StatusCode::CONFLICT, "CONFLICT", self.to_string())
            }
            AppError::Queue(QueueError::Closed) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
                self.to_string(),
            ),

            // --- Store errors ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Result store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Job results are temporarily unavailable".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
