//! Live event gateway shared by the SSE and WebSocket transports.
//!
//! [`forward`] relays events from one job [`Subscription`] into a bounded
//! channel owned by the transport. It waits on "next event" and "client
//! gone" at the same time, so a disconnect is noticed immediately even when
//! the job is silent. Returning drops the subscription, which releases it
//! on the bus. Late subscribers only see events published after they
//! attached; finished jobs are answered by the status endpoint.

use scenegen_core::job_events::JobEvent;
use scenegen_events::Subscription;
use tokio::sync::mpsc;

/// Buffer between the gateway and a transport.
pub const EVENT_BUFFER: usize = 16;

/// `error_type` reported when the stream itself breaks.
pub const STREAM_ERROR: &str = "StreamError";

/// Why a forwarding loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A `complete` or `error` event was delivered.
    Terminal,
    /// The transport dropped its receiver.
    Disconnected,
    /// The subscription broke; a synthesized `error` event was sent.
    Fault,
}

/// Relay events for one job until a terminal event, a disconnect or a
/// subscription fault.
pub async fn forward(mut subscription: Subscription, tx: mpsc::Sender<JobEvent>) -> StreamEnd {
    let job_id = subscription.job_id().to_string();

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!(job_id = %job_id, "Stream client disconnected");
                return StreamEnd::Disconnected;
            }
            next = subscription.recv() => next,
        };

        match next {
            Ok(event) => {
                let terminal = event.kind.is_terminal();
                if tx.send(event).await.is_err() {
                    tracing::debug!(job_id = %job_id, "Stream client disconnected");
                    return StreamEnd::Disconnected;
                }
                if terminal {
                    return StreamEnd::Terminal;
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Event subscription failed");
                let _ = tx
                    .send(JobEvent::fault(job_id.as_str(), e.to_string(), STREAM_ERROR))
                    .await;
                return StreamEnd::Fault;
            }
        }
    }
}
