//! WebSocket upgrade handler and per-connection receive loop for the order feed.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::AppState;

use super::registry::{BroadcastRegistry, ConnectionHandle, ConnectionId, Payload};

/// Outcome of waiting for the next client frame.
enum Inbound {
    Text(String),
    Closed,
    Error(axum::Error),
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/orders", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, ws_rx) = socket.split();

    let (handle, outbox) = ConnectionHandle::channel(state.config.ws_outbox_capacity);
    let connection_id = handle.id().clone();

    let writer = tokio::spawn(drain_outbox(connection_id.clone(), outbox, ws_tx));
    state.registry.register(handle);

    tracing::info!(
        connection_id = %connection_id,
        connections = state.registry.len(),
        "push connection registered"
    );

    run_connection(&connection_id, &state.registry, ws_rx, writer).await;

    tracing::info!(
        connection_id = %connection_id,
        connections = state.registry.len(),
        "push connection ended"
    );
}

/// Broadcast inbound text until the client goes away or the writer task
/// exits, then deregister the connection.
async fn run_connection<S>(
    connection_id: &ConnectionId,
    registry: &BroadcastRegistry,
    mut ws_rx: S,
    mut writer: JoinHandle<()>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        tokio::select! {
            inbound = next_inbound(&mut ws_rx) => match inbound {
                Inbound::Text(text) => registry.broadcast(text),
                Inbound::Closed => {
                    tracing::debug!(connection_id = %connection_id, "client closed connection");
                    break;
                }
                Inbound::Error(err) => {
                    tracing::debug!(?err, connection_id = %connection_id, "ws read error");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(connection_id = %connection_id, "writer ended, closing connection");
                break;
            }
        }
    }

    registry.deregister(connection_id);
    writer.abort();
}

/// Wait for the next text frame, skipping control and binary frames.
async fn next_inbound<S>(ws_rx: &mut S) -> Inbound
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => return Inbound::Text(text.as_str().to_owned()),
            Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Inbound::Closed,
            Some(Err(err)) => return Inbound::Error(err),
        }
    }
}

/// Forward queued broadcasts to the socket until the outbox closes or a
/// write fails.
async fn drain_outbox(
    connection_id: ConnectionId,
    mut outbox: mpsc::Receiver<Payload>,
    mut ws_tx: SplitSink<WebSocket, Message>,
) {
    while let Some(payload) = outbox.recv().await {
        if let Err(err) = ws_tx.send(Message::Text(payload.to_string().into())).await {
            tracing::debug!(?err, connection_id = %connection_id, "ws write error");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;
    use tokio::time;

    use super::*;

    type Frame = Result<Message, axum::Error>;

    fn register(registry: &BroadcastRegistry) -> (ConnectionId, mpsc::Receiver<Payload>) {
        let (handle, rx) = ConnectionHandle::channel(16);
        let id = handle.id().clone();
        assert!(registry.register(handle));
        (id, rx)
    }

    #[tokio::test]
    async fn writer_exit_ends_loop_and_deregisters() {
        let registry = BroadcastRegistry::new();
        let (id, outbox) = register(&registry);

        // The socket never yields anything; only the writer side fails.
        let writer = tokio::spawn(async move { drop(outbox) });

        time::timeout(
            Duration::from_secs(5),
            run_connection(&id, &registry, stream::pending::<Frame>(), writer),
        )
        .await
        .expect("receive loop kept running after writer exit");

        assert!(!registry.contains(&id));
    }

    #[tokio::test]
    async fn inbound_text_is_broadcast_until_close() {
        let registry = BroadcastRegistry::new();
        let (id, _own_outbox) = register(&registry);
        let (_other, mut other_rx) = register(&registry);

        let frames: Vec<Frame> = vec![
            Ok(Message::Ping(Default::default())),
            Ok(Message::Text("one".to_string().into())),
            Ok(Message::Binary(Default::default())),
            Ok(Message::Text("two".to_string().into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("after close".to_string().into())),
        ];
        let writer = tokio::spawn(std::future::pending::<()>());

        run_connection(&id, &registry, stream::iter(frames), writer).await;

        assert!(!registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(&*other_rx.try_recv().unwrap(), "one");
        assert_eq!(&*other_rx.try_recv().unwrap(), "two");
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn end_of_stream_deregisters() {
        let registry = BroadcastRegistry::new();
        let (id, _outbox) = register(&registry);
        let writer = tokio::spawn(std::future::pending::<()>());

        run_connection(&id, &registry, stream::empty::<Frame>(), writer).await;

        assert!(registry.is_empty());
    }
}
