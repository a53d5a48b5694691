//! HTTP response bodies served by the broker.

use serde::{Deserialize, Serialize};

use crate::SnapshotId;

/// Room used when a request or subscription names none.
pub const DEFAULT_ROOM: &str = "global";

/// Response to a successful snapshot upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSnapshotResponse {
    /// Broker-assigned identifier of the new record.
    pub id: SnapshotId,
}

/// Response to `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomsResponse {
    /// Names of rooms with at least one subscriber, sorted.
    pub rooms: Vec<String>,
}

/// Response to `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true when the broker answers.
    pub ok: bool,
    /// Number of snapshots held in memory.
    pub snapshots: usize,
    /// Names of active rooms, sorted.
    pub rooms: Vec<String>,
    /// Broker version.
    #[serde(default)]
    pub version: String,
    /// Seconds since the broker started.
    #[serde(default)]
    pub uptime_seconds: u64,
}

/// Response to `POST /admin/clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Always true on success.
    pub ok: bool,
}

/// JSON body carried by every HTTP error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
}
