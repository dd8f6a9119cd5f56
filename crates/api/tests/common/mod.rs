#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use scenegen_core::store::MemoryResultStore;
use scenegen_events::EventBus;
use scenegen_worker::TaskQueue;
use serde_json::Value;
use tower::ServiceExt;

use scenegen_api::config::ServerConfig;
use scenegen_api::router::build_app_router;
use scenegen_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        worker_count: 2,
        result_retention_secs: 3600,
        database_url: None,
    }
}

/// The router plus handles on the shared components behind it, so tests
/// can play the worker's part directly.
pub struct TestApp {
    pub router: Router,
    pub queue: Arc<TaskQueue>,
    pub bus: EventBus,
    pub store: Arc<MemoryResultStore>,
}

/// Build the full application router with an in-memory result store and
/// no workers attached.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let queue = Arc::new(TaskQueue::new());
    let bus = EventBus::default();
    let store = Arc::new(MemoryResultStore::default());

    let state = AppState {
        config: Arc::new(config.clone()),
        queue: Arc::clone(&queue),
        event_bus: bus.clone(),
        result_store: store.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        queue,
        bus,
        store,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read SSE frames until the accumulated text contains `needle`, the
/// stream ends, or `wait` elapses. Returns everything read so far.
pub async fn read_sse_until(body: &mut Body, needle: &str, wait: Duration) -> String {
    let mut text = String::new();
    let _ = tokio::time::timeout(wait, async {
        while let Some(frame) = body.frame().await {
            let Ok(frame) = frame else { break };
            if let Ok(data) = frame.into_data() {
                text.push_str(&String::from_utf8_lossy(&data));
            }
            if text.contains(needle) {
                break;
            }
        }
    })
    .await;
    text
}

/// Poll until `check` passes or a second has gone by.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Serve `router` on an ephemeral local port and return its address.
pub async fn serve(router: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
