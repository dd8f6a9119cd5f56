//! Shared HTTP plumbing for the backend clients.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`ProviderError::Api`] containing the status
/// and body text on failure.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let response = ensure_success(provider, response).await?;
    Ok(response.json::<T>().await?)
}

/// Merge caller-supplied request fields into `body`, overriding built-in keys.
pub(crate) fn merge_params(
    body: &mut serde_json::Value,
    extra: Option<&serde_json::Map<String, serde_json::Value>>,
) {
    if let (Some(target), Some(extra)) = (body.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
}
