//! Background job execution.
//!
//! Submissions land in the in-process [`TaskQueue`]; a [`WorkerPool`] of N
//! [`Worker`]s drains it, each running one job at a time through its own
//! [`JobExecutor`] (normally a per-worker provider cache).

pub mod executor;
pub mod pool;
pub mod queue;

pub use executor::{JobExecutor, Worker};
pub use pool::WorkerPool;
pub use queue::{QueueError, TaskQueue};
