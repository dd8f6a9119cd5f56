use scenegen_core::error::CoreError;

/// Errors from a provider backend or from preparing its request.
///
/// Every variant maps to a stable [`error_type`](ProviderError::error_type)
/// string that is reported to clients next to the message.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The job spec cannot be turned into a request for this backend.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backend answered but produced nothing usable.
    #[error("{0} returned no content")]
    EmptyResponse(&'static str),

    /// The request body could not be encoded.
    #[error("Failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is missing required configuration (e.g. an API key).
    #[error("Provider not configured: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Machine-readable error kind.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Request(e) if e.is_timeout() => "Timeout",
            Self::Request(e) if e.is_decode() => "DecodeError",
            Self::Request(_) => "NetworkError",
            Self::Api { .. } => "ApiError",
            Self::InvalidInput(_) => "InvalidInput",
            Self::EmptyResponse(_) => "EmptyResponse",
            Self::Serialization(_) => "SerializationError",
            Self::Configuration(_) => "ConfigurationError",
        }
    }

    /// Upstream HTTP status, when the backend answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<CoreError> for ProviderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}
