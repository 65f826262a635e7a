//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server-originated message with the current timestamp.
    #[must_use]
    pub fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message answering request `id`.
    #[must_use]
    pub fn error(id: String, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client event addressed to the connected user.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands a client can send in the payload of a
/// [`WsMessageType::Command`] message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Resume delivery of the given event types.
    Subscribe {
        /// Event type names, e.g. `"appointment_booked"`.
        event_types: Vec<String>,
    },
    /// Pause delivery of the given event types.
    Unsubscribe {
        /// Event type names.
        event_types: Vec<String>,
    },
    /// Liveness probe; answered with `pong`.
    Ping,
}
