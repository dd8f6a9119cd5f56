//! Live job event fan-out.
//!
//! - [`EventBus`]: in-process publish/subscribe hub with one broadcast
//!   channel per job id, created on first subscribe and removed when the
//!   last [`Subscription`] is dropped.
//! - [`EventPublisher`]: the publishing seam the worker depends on.

pub mod bus;

pub use bus::{EventBus, EventBusError, EventPublisher, Subscription, SubscriptionError};
