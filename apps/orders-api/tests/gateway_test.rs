mod common;

use std::time::Duration;

use futures_util::SinkExt;
use tokio::time;
use tokio_tungstenite::tungstenite;

async fn create_order(addr: std::net::SocketAddr, symbol: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/orders"))
        .json(&serde_json::json!({
            "symbol": symbol,
            "price": 12.5,
            "quantity": 7,
            "order_type": "buy",
        }))
        .send()
        .await
        .expect("create request");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("parse order")
}

async fn delete_order(addr: std::net::SocketAddr, id: i64) -> reqwest::StatusCode {
    reqwest::Client::new()
        .delete(format!("http://{addr}/orders/{id}"))
        .send()
        .await
        .expect("delete request")
        .status()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inbound_text_is_broadcast_verbatim_to_every_connection() {
    let (addr, state) = common::start_server().await;

    let mut a = common::connect_feed(addr).await;
    let mut b = common::connect_feed(addr).await;
    common::wait_for_connections(&state, 2).await;

    a.send(tungstenite::Message::Text("hello desk".into()))
        .await
        .expect("send text");

    assert_eq!(common::next_text(&mut a).await, "hello desk");
    assert_eq!(common::next_text(&mut b).await, "hello desk");
}

#[tokio::test]
async fn created_order_is_pushed_to_connected_clients() {
    let (addr, state) = common::start_server().await;

    let mut a = common::connect_feed(addr).await;
    let mut b = common::connect_feed(addr).await;
    common::wait_for_connections(&state, 2).await;

    let order = create_order(addr, "GOOG").await;

    for ws in [&mut a, &mut b] {
        let event = common::next_event(ws).await;
        assert_eq!(event["event"], "new_order");
        assert_eq!(event["data"], order);
        assert_eq!(event["data"]["order_type"], "BUY");
    }
}

#[tokio::test]
async fn deleted_order_is_pushed_and_failed_delete_is_not() {
    let (addr, state) = common::start_server().await;
    let order = create_order(addr, "META").await;
    let id = order["id"].as_i64().unwrap();

    let mut ws = common::connect_feed(addr).await;
    common::wait_for_connections(&state, 1).await;

    assert_eq!(delete_order(addr, id + 1).await, reqwest::StatusCode::NOT_FOUND);
    common::assert_silent(&mut ws).await;

    assert_eq!(delete_order(addr, id).await, reqwest::StatusCode::NO_CONTENT);
    let event = common::next_event(&mut ws).await;
    assert_eq!(event, serde_json::json!({ "event": "delete_order", "data": { "id": id } }));
}

#[tokio::test]
async fn closing_a_connection_deregisters_it() {
    let (addr, state) = common::start_server().await;

    let mut a = common::connect_feed(addr).await;
    let mut b = common::connect_feed(addr).await;
    common::wait_for_connections(&state, 2).await;

    a.close(None).await.expect("close");
    common::wait_for_connections(&state, 1).await;

    // The survivor still gets events.
    let order = create_order(addr, "ORCL").await;
    let event = common::next_event(&mut b).await;
    assert_eq!(event["data"]["id"], order["id"]);
}

#[tokio::test]
async fn dropped_connection_without_close_frame_is_deregistered() {
    let (addr, state) = common::start_server().await;

    let a = common::connect_feed(addr).await;
    common::wait_for_connections(&state, 1).await;

    drop(a);
    common::wait_for_connections(&state, 0).await;

    // Broadcasting into an empty registry is harmless.
    create_order(addr, "INTC").await;
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn many_clients_each_receive_exactly_one_copy() {
    let (addr, state) = common::start_server().await;

    let mut clients = Vec::new();
    for _ in 0..20 {
        clients.push(common::connect_feed(addr).await);
    }
    common::wait_for_connections(&state, 20).await;

    state.registry.broadcast("fanout");

    for ws in &mut clients {
        assert_eq!(common::next_text(ws).await, "fanout");
    }
    time::sleep(Duration::from_millis(50)).await;
    for ws in &mut clients {
        common::assert_silent(ws).await;
    }
}
