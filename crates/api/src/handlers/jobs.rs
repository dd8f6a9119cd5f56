//! Handlers for the `/jobs` and `/queue` resources.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::{Stream, StreamExt};
use scenegen_core::job::SubmitJob;
use scenegen_core::job_events::JobEvent;
use scenegen_core::status::JobStatus;
use scenegen_core::types::JobId;
use scenegen_worker::QueueError;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::stream::{self, EVENT_BUFFER};

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Response body for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Validate and enqueue a job. Returns 202 with the job id; the job starts
/// in `pending` status and is picked up by the next free worker.
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJob>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    enqueue(&state, input, None).await
}

/// POST /api/v1/queue/{kind}
///
/// Same as [`submit_job`] with the kind taken from the path.
pub async fn submit_to_queue(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    payload: Result<Json<SubmitJob>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    enqueue(&state, input, Some(&kind)).await
}

/// Job ids are single-use. A stored result claims its id even after the
/// queue has forgotten the job, so both are checked.
async fn enqueue(
    state: &AppState,
    input: SubmitJob,
    kind: Option<&str>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let job = input.into_job(kind)?;
    let job_id = job.id.clone();
    let kind = job.kind;

    if state.result_store.get(&job_id).await?.is_some() {
        return Err(QueueError::Conflict(job_id).into());
    }
    state.queue.enqueue(job)?;
    tracing::info!(job_id = %job_id, %kind, "Job submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            status: JobStatus::Pending,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let view = state.status_resolver().get_status(&job_id).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Live events
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/events
///
/// Server-Sent Events stream of `start`, `complete` and `error` events.
/// The subscription is taken before the response is returned and released
/// when the client goes away or a terminal event has been sent.
pub async fn job_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.event_bus.subscribe(job_id.as_str());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(stream::forward(subscription, tx));
    tracing::debug!(job_id = %job_id, "SSE stream opened");

    let events = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn sse_event(event: &JobEvent) -> Event {
    Event::default()
        .event(event.kind.as_str())
        .data(event.payload.to_string())
}
