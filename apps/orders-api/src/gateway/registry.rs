//! Registry of live push connections with best-effort broadcast fan-out.
//!
//! Every connection owns a bounded outbox drained by its own writer task, so
//! broadcasting never waits on a socket: each recipient gets a non-blocking
//! `try_send`. A recipient whose outbox is closed is deregistered on the
//! spot; one whose outbox is full just misses that message.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use orders_common::id::{prefix, prefixed_ulid};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::events::OrderEvent;

/// An immutable text payload shared by every recipient of one broadcast.
pub type Payload = Arc<str>;

/// Identity of a push connection (`ws_` prefixed ULID).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(prefixed_ulid(prefix::CONNECTION))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dispatch handle for one connection. The transport owns the socket and the
/// receiving end of the outbox; the registry only ever pushes into it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbox: mpsc::Sender<Payload>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbox: mpsc::Sender<Payload>) -> Self {
        Self { id, outbox }
    }

    /// Create a handle with a fresh identity and an outbox of `capacity`
    /// messages, returning the receiving end for the writer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(ConnectionId::generate(), tx), rx)
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }
}

/// Shared set of live connections. One instance per process, stored in
/// `AppState`.
#[derive(Default)]
pub struct BroadcastRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Registering an ID that is already present is a
    /// no-op and returns `false`.
    pub fn register(&self, handle: ConnectionHandle) -> bool {
        match self.connections.write().entry(handle.id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(connection_id = %handle.id, "connection already registered");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Remove a connection. Returns `false` if it was not registered.
    pub fn deregister(&self, id: &ConnectionId) -> bool {
        self.connections.write().remove(id).is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Attempt delivery of `payload` to every connection registered at the
    /// moment of the call. Never fails and never blocks on a recipient.
    pub fn broadcast(&self, payload: impl Into<Payload>) {
        let payload = payload.into();

        // Snapshot under the read lock; sends happen after it is released.
        let recipients: Vec<ConnectionHandle> =
            self.connections.read().values().cloned().collect();

        let mut dropped = 0usize;
        let mut gone = Vec::new();
        for handle in &recipients {
            match handle.outbox.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    tracing::warn!(
                        connection_id = %handle.id,
                        "outbox full, dropping broadcast for slow connection"
                    );
                }
                Err(TrySendError::Closed(_)) => gone.push(&handle.id),
            }
        }

        for id in &gone {
            if self.deregister(id) {
                tracing::debug!(connection_id = %id, "deregistered closed connection");
            }
        }

        tracing::debug!(
            recipients = recipients.len(),
            dropped,
            deregistered = gone.len(),
            "broadcast dispatched"
        );
    }

    /// Serialize an order event and broadcast it.
    pub fn publish(&self, event: &OrderEvent) {
        match event.to_payload() {
            Ok(payload) => self.broadcast(payload),
            Err(err) => {
                tracing::error!(?err, event = event.name(), "failed to serialize order event");
            }
        }
    }
}
