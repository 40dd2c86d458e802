//! Order events pushed to connected clients.

use std::sync::Arc;

use serde::Serialize;

use crate::models::order::Order;

/// Event names as they appear in the `event` field on the wire.
pub struct EventName;

impl EventName {
    pub const NEW_ORDER: &'static str = "new_order";
    pub const DELETE_ORDER: &'static str = "delete_order";
}

/// A domain event serialized as `{"event": <name>, "data": <object>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OrderEvent {
    /// An order was created. `data` is the full order.
    NewOrder(Order),
    /// An order was deleted. `data` carries only its ID.
    DeleteOrder { id: i64 },
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::NewOrder(_) => EventName::NEW_ORDER,
            OrderEvent::DeleteOrder { .. } => EventName::DELETE_ORDER,
        }
    }

    /// Serialize into the text payload handed to the broadcast registry.
    pub fn to_payload(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}
