//! Adapter behaviour against a local mock of each backend.
//!
//! Every test starts an axum server on an ephemeral port that records the
//! last request body it received and replies with a canned response.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use scenegen_core::job::{JobKind, JobSpec};
use scenegen_providers::{ProviderConfig, ProviderError, Providers};
use serde_json::{json, Value};

#[derive(Clone)]
struct Mock {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    seen: Arc<Mutex<Option<(HeaderMap, Value)>>>,
}

async fn handle(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    *mock.seen.lock().unwrap() = Some((headers, body));
    tokio::time::sleep(mock.delay).await;
    (mock.status, Json(mock.reply.clone()))
}

/// Start a mock answering every backend path. Returns the base URL and the
/// captured-request slot.
async fn start_mock(
    status: StatusCode,
    reply: Value,
    delay: Duration,
) -> (String, Arc<Mutex<Option<(HeaderMap, Value)>>>) {
    let seen = Arc::new(Mutex::new(None));
    let mock = Mock {
        status,
        reply,
        delay,
        seen: Arc::clone(&seen),
    };
    let app = Router::new()
        .route("/v1/messages", post(handle))
        .route("/v1/images/generations", post(handle))
        .route("/v1beta/models/{model}", post(handle))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn providers(base_url: &str, timeout: Duration) -> Providers {
    Providers::new(ProviderConfig::uniform(base_url, "test-key", timeout))
}

fn anthropic_reply(text: &str) -> Value {
    json!({
        "model": "claude-mock",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 10, "output_tokens": 4}
    })
}

// ---------------------------------------------------------------------------
// Test: text_prompt success carries content, model and usage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_prompt_success() {
    let (base, seen) = start_mock(StatusCode::OK, anthropic_reply("hello"), Duration::ZERO).await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let completion = providers
        .execute(JobKind::TextPrompt, &JobSpec::from_prompt("say hello"))
        .await
        .unwrap();

    assert_eq!(completion.content, "hello");
    assert_eq!(completion.model, "claude-mock");
    assert_eq!(completion.usage.input_tokens, 10);
    assert_eq!(completion.usage.output_tokens, 4);
    assert_eq!(completion.usage.total_tokens, 14);

    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers["x-api-key"], "test-key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["messages"][0]["content"][0]["text"], "say hello");
    assert_eq!(body["max_tokens"], 4096);
}

// ---------------------------------------------------------------------------
// Test: upstream error status is surfaced with its body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_rate_limit_is_an_api_error() {
    let (base, _) = start_mock(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"type": "rate_limit_error"}}),
        Duration::ZERO,
    )
    .await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let err = providers
        .execute(JobKind::TextPrompt, &JobSpec::from_prompt("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.error_type(), "ApiError");
    assert_matches!(err, ProviderError::Api { ref body, .. } if body.contains("rate_limit_error"));
}

// ---------------------------------------------------------------------------
// Test: a slow backend trips the per-backend timeout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_backend_times_out() {
    let (base, _) = start_mock(
        StatusCode::OK,
        anthropic_reply("late"),
        Duration::from_secs(2),
    )
    .await;
    let mut providers = providers(&base, Duration::from_millis(200));

    let err = providers
        .execute(JobKind::TextPrompt, &JobSpec::from_prompt("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "Timeout");
}

// ---------------------------------------------------------------------------
// Test: scene jobs send the image block without the data URI prefix
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scene_job_sends_stripped_image_block() {
    let (base, seen) = start_mock(
        StatusCode::OK,
        anthropic_reply("```javascript\nconst scene = new THREE.Scene();\n```"),
        Duration::ZERO,
    )
    .await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let mut spec = JobSpec::from_prompt("EXIT");
    spec.image = Some("data:image/png;base64,AAAA".into());
    let completion = providers.execute(JobKind::ImageToScene, &spec).await.unwrap();
    assert!(completion.content.contains("THREE.Scene"));

    let (_, body) = seen.lock().unwrap().take().unwrap();
    let content = &body["messages"][0]["content"];
    assert_eq!(content[1]["type"], "image");
    assert_eq!(content[1]["source"]["type"], "base64");
    assert_eq!(content[1]["source"]["media_type"], "image/png");
    assert_eq!(content[1]["source"]["data"], "AAAA");
    assert!(content[2]["text"].as_str().unwrap().ends_with("EXIT"));
    assert!(body["system"].is_string());
}

// ---------------------------------------------------------------------------
// Test: additional_params override built-in request fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn additional_params_override_request_fields() {
    let (base, seen) = start_mock(StatusCode::OK, anthropic_reply("ok"), Duration::ZERO).await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let mut spec = JobSpec::from_prompt("hi");
    spec.additional_params = json!({"max_tokens": 7, "top_k": 3}).as_object().cloned();
    providers.execute(JobKind::TextPrompt, &spec).await.unwrap();

    let (_, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(body["max_tokens"], 7);
    assert_eq!(body["top_k"], 3);
}

// ---------------------------------------------------------------------------
// Test: a response without usage yields zero counters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_usage_yields_zeros() {
    let (base, _) = start_mock(
        StatusCode::OK,
        json!({"content": [{"type": "text", "text": "x"}]}),
        Duration::ZERO,
    )
    .await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let completion = providers
        .execute(JobKind::TextPrompt, &JobSpec::from_prompt("hi"))
        .await
        .unwrap();

    assert_eq!(completion.usage.input_tokens, 0);
    assert_eq!(completion.usage.output_tokens, 0);
    assert_eq!(completion.usage.total_tokens, 0);
    assert_eq!(completion.model, "claude-3-7-sonnet-20250219");
}

// ---------------------------------------------------------------------------
// Test: gemini_prompt goes through generateContent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gemini_prompt_success() {
    let (base, seen) = start_mock(
        StatusCode::OK,
        json!({
            "candidates": [{"content": {"parts": [{"text": "bonjour"}]}}],
            "usageMetadata": {
                "promptTokenCount": 2,
                "candidatesTokenCount": 1,
                "totalTokenCount": 3
            }
        }),
        Duration::ZERO,
    )
    .await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let completion = providers
        .execute(JobKind::GeminiPrompt, &JobSpec::from_prompt("hello in french"))
        .await
        .unwrap();

    assert_eq!(completion.content, "bonjour");
    assert_eq!(completion.usage.total_tokens, 3);

    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers["x-goog-api-key"], "test-key");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "hello in french");
}

// ---------------------------------------------------------------------------
// Test: image_generation returns a data URI
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_generation_returns_data_uri() {
    let (base, seen) = start_mock(
        StatusCode::OK,
        json!({"data": [{"b64_json": "AAAA"}]}),
        Duration::ZERO,
    )
    .await;
    let mut providers = providers(&base, Duration::from_secs(5));

    let completion = providers
        .execute(JobKind::ImageGeneration, &JobSpec::from_prompt("a red cube"))
        .await
        .unwrap();

    assert_eq!(completion.content, "data:image/png;base64,AAAA");
    assert_eq!(completion.model, "dall-e-3");

    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers["authorization"], "Bearer test-key");
    assert_eq!(body["response_format"], "b64_json");
    assert_eq!(body["n"], 1);
}
