//! Shared domain types for the scenegen job engine.
//!
//! Jobs, results, lifecycle events, inline image decoding, and the
//! result-store contract used by both the worker and the API.

pub mod error;
pub mod image;
pub mod job;
pub mod job_events;
pub mod result;
pub mod status;
pub mod store;
pub mod types;
