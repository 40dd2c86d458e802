#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use orders_api::config::Config;
use orders_api::db::store::MemoryOrderStore;
use orders_api::AppState;

pub type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build a test AppState backed by the in-memory order store.
pub fn test_state() -> AppState {
    AppState::new(Config::default(), Arc::new(MemoryOrderStore::new()))
}

/// Build the full application router wired to a fresh test state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = orders_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background for the rest of the test.
pub async fn start_server() -> (SocketAddr, AppState) {
    let (app, state) = test_app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Open a connection on the order feed.
pub async fn connect_feed(addr: SocketAddr) -> FeedStream {
    let url = format!("ws://{addr}/ws/orders");
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws_stream
}

/// Wait until the registry holds exactly `expected` connections. Registration
/// happens after the upgrade completes, so it can trail the client handshake.
pub async fn wait_for_connections(state: &AppState, expected: usize) {
    time::timeout(Duration::from_secs(5), async {
        while state.registry.len() != expected {
            time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {expected} connections, registry has {}",
            state.registry.len()
        )
    });
}

/// Read the next text frame, skipping control frames.
pub async fn next_text(ws: &mut FeedStream) -> String {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => return text.as_str().to_owned(),
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

/// Read the next frame and parse it as a JSON event envelope.
pub async fn next_event(ws: &mut FeedStream) -> serde_json::Value {
    let text = next_text(ws).await;
    serde_json::from_str(&text).expect("parse event")
}

/// Assert nothing arrives on the stream for a short while.
pub async fn assert_silent(ws: &mut FeedStream) {
    if let Ok(Some(msg)) = time::timeout(Duration::from_millis(200), ws.next()).await {
        panic!("Expected no message, got: {msg:?}");
    }
}
