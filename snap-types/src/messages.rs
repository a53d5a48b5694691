//! WebSocket frames exchanged between the broker and subscribers.
//!
//! The subscriber channel is read-only for control purposes: the only
//! client frame the broker acts on is a liveness ping.

use serde::{Deserialize, Serialize};

use crate::{SnapshotSummary, TypesError};

/// Frames sent by the broker to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent immediately after a subscriber is registered.
    Welcome {
        /// Room the subscriber joined.
        room: String,
        /// Broker time, milliseconds since the Unix epoch.
        ts: u64,
    },
    /// A new snapshot was stored in the subscriber's room.
    Snapshot {
        /// Payload-free record view.
        record: SnapshotSummary,
    },
    /// Reply to a ping.
    Pong {
        /// Broker time, milliseconds since the Unix epoch.
        ts: u64,
    },
}

impl ServerMessage {
    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, TypesError> {
        serde_json::to_string(self).map_err(TypesError::Serialization)
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, TypesError> {
        serde_json::from_str(text).map_err(TypesError::Deserialization)
    }
}

/// Frames the broker understands from subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Liveness check, answered with [`ServerMessage::Pong`].
    Ping,
}

impl ClientMessage {
    /// Interpret a text frame.
    ///
    /// Accepts `{"type":"ping"}` or the bare text `ping`. Anything else,
    /// including malformed JSON, yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed == "ping" {
            return Some(ClientMessage::Ping);
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, TypesError> {
        serde_json::to_string(self).map_err(TypesError::Serialization)
    }
}
