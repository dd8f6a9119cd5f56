//! Live event streams and the health endpoint.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use scenegen_core::job_events::JobEvent;
use scenegen_core::result::{Completion, JobResult, Usage};
use scenegen_core::store::ResultStore;
use serde_json::json;

use common::{body_json, build_test_app, eventually, get, post_json, read_sse_until};

const WAIT: Duration = Duration::from_secs(2);

fn success(job_id: &str) -> JobResult {
    JobResult::success(
        job_id,
        Completion {
            content: "scene code".to_string(),
            model: "claude-mock".to_string(),
            usage: Usage::from_counts(Some(1), Some(2), Some(3)),
        },
    )
}

// ---------------------------------------------------------------------------
// Test: SSE stream delivers start then complete and ends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sse_stream_delivers_events_in_order() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/jobs/sse-1/events").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    // The subscription exists as soon as the response is returned.
    assert_eq!(app.bus.subscriber_count("sse-1"), 1);

    app.bus.send(JobEvent::start("sse-1"));
    app.bus.send(JobEvent::terminal(&success("sse-1")));

    let mut body = response.into_body();
    let text = read_sse_until(&mut body, "event: complete", WAIT).await;

    let start = text.find("event: start").expect("start event missing");
    let complete = text.find("event: complete").expect("complete event missing");
    assert!(start < complete);
    assert!(text.contains("\"content\":\"scene code\""));
    assert!(text.contains("\"job_id\":\"sse-1\""));

    assert!(eventually(|| app.bus.subscriber_count("sse-1") == 0).await);
}

#[tokio::test]
async fn sse_stream_ends_on_error_event() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/jobs/sse-2/events").await;
    app.bus
        .send(JobEvent::terminal(&JobResult::failure("sse-2", "boom", "ApiError")));

    let mut body = response.into_body();
    let text = read_sse_until(&mut body, "event: error", WAIT).await;
    assert!(text.contains("event: error"));
    assert!(text.contains("\"error_type\":\"ApiError\""));
}

// ---------------------------------------------------------------------------
// Test: other jobs' events are not delivered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sse_stream_filters_by_job_id() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/jobs/mine/events").await;
    app.bus.send(JobEvent::start("theirs"));
    app.bus.send(JobEvent::terminal(&success("theirs")));
    app.bus.send(JobEvent::start("mine"));

    let mut body = response.into_body();
    let text = read_sse_until(&mut body, "event: start", WAIT).await;
    assert!(text.contains("\"job_id\":\"mine\""));
    assert!(!text.contains("theirs"));
}

// ---------------------------------------------------------------------------
// Test: a dropped client releases its subscription
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropping_sse_response_releases_subscription() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/jobs/gone/events").await;
    assert_eq!(app.bus.subscriber_count("gone"), 1);

    drop(response);
    assert!(eventually(|| app.bus.subscriber_count("gone") == 0).await);
    assert_eq!(app.bus.channel_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: a late subscriber sees nothing but polling finds the result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_subscriber_misses_events_but_status_has_result() {
    let app = build_test_app();

    // The worker finished before anyone subscribed.
    app.bus.send(JobEvent::start("late"));
    app.bus.send(JobEvent::terminal(&success("late")));
    app.store.put(&success("late")).await.unwrap();

    let response = get(&app.router, "/api/v1/jobs/late/events").await;
    let mut body = response.into_body();
    let text = read_sse_until(&mut body, "event:", Duration::from_millis(200)).await;
    assert!(!text.contains("event: start"));
    assert!(!text.contains("event: complete"));

    let status = body_json(get(&app.router, "/api/v1/jobs/late").await).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["content"], "scene code");
}

// ---------------------------------------------------------------------------
// Test: closing the bus ends open streams with a StreamError
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closing_bus_ends_stream_with_fault() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/jobs/shutdown/events").await;
    tokio::task::yield_now().await;
    app.bus.close_all();

    let mut body = response.into_body();
    let text = read_sse_until(&mut body, "StreamError", WAIT).await;
    assert!(text.contains("event: error"));
    assert!(text.contains("\"error_type\":\"StreamError\""));
}

// ---------------------------------------------------------------------------
// Test: health reports workers and queue depth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_load() {
    let app = build_test_app();

    post_json(
        &app.router,
        "/api/v1/jobs",
        json!({"kind": "text_prompt", "prompt": "a"}),
    )
    .await;
    post_json(
        &app.router,
        "/api/v1/jobs",
        json!({"kind": "text_prompt", "prompt": "b"}),
    )
    .await;

    let response = get(&app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["workers"], 2);
    assert_eq!(body["queue_depth"], 2);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn health_reports_shutdown() {
    let app = build_test_app();
    app.queue.close();

    let body = body_json(get(&app.router, "/health").await).await;
    assert_eq!(body["status"], "shutting_down");
}
