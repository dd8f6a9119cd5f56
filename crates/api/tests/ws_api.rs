//! WebSocket event stream over a real socket.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use scenegen_core::job_events::JobEvent;
use scenegen_core::result::{Completion, JobResult, Usage};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use common::{build_test_app, eventually, serve};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

fn success(job_id: &str) -> JobResult {
    JobResult::success(
        job_id,
        Completion {
            content: "scene code".to_string(),
            model: "claude-mock".to_string(),
            usage: Usage::from_counts(Some(1), Some(2), None),
        },
    )
}

async fn connect(addr: SocketAddr, job_id: &str) -> Socket {
    let url = format!("ws://{addr}/api/v1/jobs/{job_id}/ws");
    let (socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    socket
}

// ---------------------------------------------------------------------------
// Test: frames arrive in order and the socket closes after the terminal event
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ws_delivers_events_in_order_then_closes() {
    let app = build_test_app();
    let addr = serve(app.router.clone()).await;

    let mut socket = connect(addr, "ws-1").await;
    assert!(eventually(|| app.bus.subscriber_count("ws-1") == 1).await);

    app.bus.send(JobEvent::start("ws-1"));
    app.bus.send(JobEvent::terminal(&success("ws-1")));

    let mut frames: Vec<Value> = Vec::new();
    let mut closed = false;
    tokio::time::timeout(WAIT, async {
        while let Some(msg) = socket.next().await {
            match msg.unwrap() {
                Message::Text(text) => frames.push(serde_json::from_str(&text).unwrap()),
                Message::Close(_) => {
                    closed = true;
                    break;
                }
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert!(closed);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["event"], "start");
    assert_eq!(frames[0]["data"]["job_id"], "ws-1");
    assert_eq!(frames[1]["event"], "complete");
    assert_eq!(frames[1]["data"]["job_id"], "ws-1");
    assert_eq!(frames[1]["data"]["content"], "scene code");

    assert!(eventually(|| app.bus.subscriber_count("ws-1") == 0).await);
}

// ---------------------------------------------------------------------------
// Test: only the subscribed job's events are sent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ws_filters_by_job_id() {
    let app = build_test_app();
    let addr = serve(app.router.clone()).await;

    let mut socket = connect(addr, "mine").await;
    assert!(eventually(|| app.bus.subscriber_count("mine") == 1).await);

    app.bus.send(JobEvent::start("theirs"));
    app.bus.send(JobEvent::start("mine"));

    let first = tokio::time::timeout(WAIT, socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert_eq!(frame["event"], "start");
    assert_eq!(frame["data"]["job_id"], "mine");
}

// ---------------------------------------------------------------------------
// Test: a client that closes first releases its subscription
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ws_client_close_releases_subscription() {
    let app = build_test_app();
    let addr = serve(app.router.clone()).await;

    let mut socket = connect(addr, "quit").await;
    assert!(eventually(|| app.bus.subscriber_count("quit") == 1).await);

    socket.close(None).await.unwrap();

    assert!(eventually(|| app.bus.subscriber_count("quit") == 0).await);
    assert_eq!(app.bus.channel_count(), 0);
}
