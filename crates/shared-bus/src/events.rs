//! # Notification Events
//!
//! Every message that travels over the bus and out to a WebSocket client.
//! The set is closed: clients understand exactly these `event` kinds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast channel for unauthenticated clients.
pub const CHANNEL_GLOBAL: &str = "global";

/// Channel restricted to authenticated administrators.
pub const CHANNEL_ADMIN: &str = "admin";

/// A message delivered to WebSocket clients.
///
/// Serialized with an `event` tag, e.g.
/// `{"event":"orders_changed","id":"4f0c..."}` or `{"event":"pong"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WsMessage {
    /// Orders were created, updated or deleted.
    OrdersChanged { id: String },

    /// The menu tree changed.
    MenuChanged { id: String },

    /// Answer to a client `ping` frame. Carries no id.
    Pong,
}

impl WsMessage {
    /// A fresh `orders_changed` event with a random id.
    pub fn orders_changed() -> Self {
        Self::OrdersChanged {
            id: Uuid::new_v4().to_string(),
        }
    }

    /// A fresh `menu_changed` event with a random id.
    pub fn menu_changed() -> Self {
        Self::MenuChanged {
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Id used for duplicate suppression.
    ///
    /// `None` for protocol messages and for events with an empty id; such
    /// messages are always delivered.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::OrdersChanged { id } | Self::MenuChanged { id } if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Wire name of the event kind.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::OrdersChanged { .. } => "orders_changed",
            Self::MenuChanged { .. } => "menu_changed",
            Self::Pong => "pong",
        }
    }
}
