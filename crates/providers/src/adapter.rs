//! The capability interface every backend implements.

use async_trait::async_trait;
use scenegen_core::job::JobSpec;
use scenegen_core::result::Completion;

use crate::error::ProviderError;

/// One external generation backend.
///
/// A job flows through the four steps in order; [`run`] drives them.
/// Adapters are built once per worker and reused sequentially, so they may
/// hold an HTTP client and other per-process state.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Backend-native request.
    type Params: Send;
    /// Backend-native response.
    type Response: Send + Sync;

    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Validate the job spec and build the native request.
    fn prepare(&self, spec: &JobSpec) -> Result<Self::Params, ProviderError>;

    /// Perform the single network call.
    async fn invoke(&self, params: Self::Params) -> Result<Self::Response, ProviderError>;

    /// Pull the generated content out of the response.
    fn extract(&self, response: &Self::Response) -> Result<String, ProviderError>;

    /// Model id and usage counters. Missing usage data yields zeros.
    fn summarize(&self, response: &Self::Response, content: String) -> Completion;
}

/// Drive one job through an adapter.
pub async fn run<A: ProviderAdapter>(
    adapter: &A,
    spec: &JobSpec,
) -> Result<Completion, ProviderError> {
    let backend = adapter.name();
    let params = adapter.prepare(spec)?;

    let started = std::time::Instant::now();
    let response = adapter.invoke(params).await.inspect_err(|e| {
        tracing::warn!(backend, error = %e, "Backend call failed");
    })?;
    tracing::debug!(
        backend,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Backend call returned",
    );

    let content = adapter.extract(&response)?;
    Ok(adapter.summarize(&response, content))
}
