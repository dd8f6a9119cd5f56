//! Provider adapters for the external generation backends.
//!
//! Every backend implements [`ProviderAdapter`] (prepare → invoke →
//! extract → summarize). [`registry::provider_for`] is the static
//! kind-to-backend map, and [`Providers`] is the per-worker cache that
//! builds each adapter lazily, once.

pub mod adapter;
pub mod anthropic;
pub mod config;
pub mod error;
pub mod gemini;
mod http;
pub mod images;
pub mod registry;

pub use adapter::{run, ProviderAdapter};
pub use config::{BackendConfig, ProviderConfig};
pub use error::ProviderError;
pub use registry::{provider_for, ProviderKind, Providers};
