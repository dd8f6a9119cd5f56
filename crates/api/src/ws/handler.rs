use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use scenegen_events::Subscription;
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::stream::{self, EVENT_BUFFER};

/// GET /api/v1/jobs/{id}/ws
///
/// Upgrades to a WebSocket carrying `{"event": .., "data": ..}` text frames
/// for one job. The subscription is taken before the upgrade completes.
pub async fn job_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let subscription = state.event_bus.subscribe(job_id);
    ws.on_upgrade(move |socket| handle_socket(socket, subscription))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Outbound frames come from the gateway; inbound traffic is only watched
/// for close. The socket is closed after the terminal event.
async fn handle_socket(socket: WebSocket, subscription: Subscription) {
    let job_id = subscription.job_id().to_string();
    tracing::info!(job_id = %job_id, "WebSocket connected");

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let forward_task = tokio::spawn(stream::forward(subscription, tx));

    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    let frame = Message::Text(event.to_message().to_string().into());
                    if sink.send(frame).await.is_err() {
                        tracing::debug!(job_id = %job_id, "WebSocket sink closed");
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(job_id = %job_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    // Dropping the receiver ends the gateway loop and releases the subscription.
    drop(rx);
    let _ = forward_task.await;
    tracing::info!(job_id = %job_id, "WebSocket disconnected");
}
