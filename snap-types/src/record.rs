//! Stored snapshot records and their broadcast view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{SnapshotId, TypesError};

/// A snapshot as stored by the broker.
///
/// `payload` is opaque client ciphertext. The broker never parses it.
/// Records are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Broker-assigned identifier.
    pub id: SnapshotId,
    /// Room the record was posted to.
    pub room: String,
    /// Opaque client-encrypted payload.
    pub payload: String,
    /// Unencrypted client metadata.
    #[serde(default = "empty_meta")]
    pub meta: Value,
    /// Broker receipt time, milliseconds since the Unix epoch.
    pub ts: u64,
}

impl SnapshotRecord {
    /// Build the payload-free view that is broadcast to subscribers.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            room: self.room.clone(),
            meta: self.meta.clone(),
            ts: self.ts,
        }
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, TypesError> {
        serde_json::to_string(self).map_err(TypesError::Serialization)
    }

    /// Parse a record from one JSON line.
    pub fn from_json_line(line: &str) -> Result<Self, TypesError> {
        serde_json::from_str(line).map_err(TypesError::Deserialization)
    }
}

/// Broadcast view of a [`SnapshotRecord`].
///
/// Has no `payload` field, so a notification can never carry ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Broker-assigned identifier.
    pub id: SnapshotId,
    /// Room the record was posted to.
    pub room: String,
    /// Unencrypted client metadata.
    pub meta: Value,
    /// Broker receipt time, milliseconds since the Unix epoch.
    pub ts: u64,
}

fn empty_meta() -> Value {
    Value::Object(Default::default())
}
