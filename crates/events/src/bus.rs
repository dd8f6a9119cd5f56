//! In-process event bus keyed by job id.
//!
//! Each job id gets its own `tokio::sync::broadcast` channel. Publishing is
//! fire-and-forget: with nobody subscribed to the job the event is dropped,
//! never buffered for late subscribers. The bus is designed to be shared via
//! `Arc<EventBus>` (or cheaply cloned) across workers and connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use scenegen_core::job_events::JobEvent;
use scenegen_core::types::JobId;
use tokio::sync::broadcast;

/// Per-job buffer. A job emits at most two events, so this only matters
/// for pathological publishers.
const DEFAULT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The bus could not accept a publish.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),
}

/// Why a [`Subscription`] stopped yielding events.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was torn down while subscribed.
    #[error("event channel closed")]
    Closed,

    /// The subscriber fell behind and `skipped` events were lost.
    #[error("subscriber lagged, {0} events skipped")]
    Lagged(u64),
}

// ---------------------------------------------------------------------------
// Publisher seam
// ---------------------------------------------------------------------------

/// Anything a worker can publish job events to.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event on its job's channel. Returns the number of
    /// subscribers that received it.
    async fn publish(&self, event: JobEvent) -> Result<usize, EventBusError>;
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

struct BusInner {
    channels: Mutex<HashMap<JobId, broadcast::Sender<JobEvent>>>,
    capacity: usize,
}

impl BusInner {
    fn channels(&self) -> MutexGuard<'_, HashMap<JobId, broadcast::Sender<JobEvent>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fan-out bus with one channel per job id.
///
/// ```rust
/// use scenegen_core::job_events::JobEvent;
/// use scenegen_events::EventBus;
///
/// let bus = EventBus::default();
/// let _sub = bus.subscribe("job-1");
///
/// assert_eq!(bus.send(JobEvent::start("job-1")), 1);
/// assert_eq!(bus.send(JobEvent::start("job-2")), 0);
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus whose per-job channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Deliver `event` to every current subscriber of its job.
    ///
    /// Returns how many subscribers received it; zero means the event was
    /// dropped.
    pub fn send(&self, event: JobEvent) -> usize {
        let channels = self.inner.channels();
        match channels.get(&event.job_id) {
            // A send error only means there are zero receivers.
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Attach to a job's channel, creating it if needed.
    pub fn subscribe(&self, job_id: impl Into<JobId>) -> Subscription {
        let job_id = job_id.into();
        let mut channels = self.inner.channels();
        let receiver = match channels.get(&job_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.inner.capacity);
                channels.insert(job_id.clone(), sender);
                receiver
            }
        };
        tracing::debug!(job_id = %job_id, "Event subscription opened");

        Subscription {
            job_id,
            receiver: Some(receiver),
            bus: Arc::clone(&self.inner),
        }
    }

    /// Number of live subscriptions on a job's channel.
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.inner
            .channels()
            .get(job_id)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    /// Number of job channels currently open.
    pub fn channel_count(&self) -> usize {
        self.inner.channels().len()
    }

    /// Tear down every channel. Open subscriptions observe
    /// [`SubscriptionError::Closed`].
    pub fn close_all(&self) {
        let mut channels = self.inner.channels();
        let count = channels.len();
        channels.clear();
        tracing::info!(count, "Closed all event channels");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: JobEvent) -> Result<usize, EventBusError> {
        Ok(self.send(event))
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A live attachment to one job's channel.
///
/// Dropping the handle releases the subscription; the channel itself is
/// removed once its last subscriber is gone.
pub struct Subscription {
    job_id: JobId,
    receiver: Option<broadcast::Receiver<JobEvent>>,
    bus: Arc<BusInner>,
}

impl Subscription {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the next event on this job's channel.
    pub async fn recv(&mut self) -> Result<JobEvent, SubscriptionError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(SubscriptionError::Closed);
        };
        match receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Closed) => Err(SubscriptionError::Closed),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(SubscriptionError::Lagged(n)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.bus.channels();
        // Drop our receiver under the lock so the count below is exact.
        drop(self.receiver.take());

        let unused = channels
            .get(&self.job_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if unused {
            channels.remove(&self.job_id);
        }
        tracing::debug!(job_id = %self.job_id, "Event subscription released");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
