//! Identity and timestamp helpers for blindsnap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Length of a snapshot id in bytes (96 bits).
pub const SNAPSHOT_ID_LEN: usize = 12;

/// A broker-assigned identifier for a stored snapshot.
///
/// 12 bytes of random data, displayed and serialized as 24 lowercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId([u8; SNAPSHOT_ID_LEN]);

impl SnapshotId {
    /// Create a new random SnapshotId.
    pub fn random() -> Self {
        let mut bytes = [0u8; SNAPSHOT_ID_LEN];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create a SnapshotId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == SNAPSHOT_ID_LEN {
            let mut arr = [0u8; SNAPSHOT_ID_LEN];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this SnapshotId.
    pub fn as_bytes(&self) -> &[u8; SNAPSHOT_ID_LEN] {
        &self.0
    }
}

impl FromStr for SnapshotId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Uppercase hex would decode fine but never matches a stored id.
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TypesError::InvalidId(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| TypesError::InvalidId(s.to_string()))?;
        Self::from_bytes(&bytes).ok_or_else(|| TypesError::InvalidId(s.to_string()))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotId({})", self)
    }
}

impl Serialize for SnapshotId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnapshotId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_is_24_hex_chars() {
        let id = SnapshotId::random();
        let display = id.to_string();
        assert_eq!(display.len(), 24);
        assert!(display.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn snapshot_id_parse_display_agree() {
        let id = SnapshotId::random();
        let parsed: SnapshotId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(SnapshotId::random(), SnapshotId::random());
    }

    #[test]
    fn snapshot_id_rejects_wrong_length() {
        assert!("a1b2c3d4e5f6".parse::<SnapshotId>().is_err());
        assert!(SnapshotId::from_bytes(&[0u8; 16]).is_none());
    }

    #[test]
    fn snapshot_id_rejects_non_hex_and_uppercase() {
        assert!("zzzzzzzzzzzzzzzzzzzzzzzz".parse::<SnapshotId>().is_err());
        assert!("A1B2C3D4E5F6A1B2C3D4E5F6".parse::<SnapshotId>().is_err());
    }

    #[test]
    fn snapshot_id_serializes_as_string() {
        let id: SnapshotId = "00112233445566778899aabb".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00112233445566778899aabb\"");
    }

    #[test]
    fn now_millis_is_recent() {
        // 2020-01-01 in ms
        assert!(now_millis() > 1_577_836_800_000);
    }
}
