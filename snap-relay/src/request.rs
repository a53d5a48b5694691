//! Upload body validation.
//!
//! Two body shapes are accepted:
//!
//! - direct: `{room?, payload, meta?}` where `payload` is an opaque string;
//! - signed envelope: `{envelope, encrypted, signature?, signer?, room?}`.
//!   The body minus `room` is stored verbatim as the payload and
//!   `envelope.meta` becomes the record meta. `encrypted` is never inspected.

use crate::error::RelayError;
use serde_json::{Map, Value};
use snap_types::DEFAULT_ROOM;

/// A validated upload, ready to become a record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    /// Target room.
    pub room: String,
    /// Opaque payload text.
    pub payload: String,
    /// Unencrypted metadata, always a JSON object.
    pub meta: Value,
}

impl NewSnapshot {
    /// Build a direct upload.
    pub fn new(room: impl Into<String>, payload: impl Into<String>, meta: Value) -> Self {
        Self {
            room: room.into(),
            payload: payload.into(),
            meta,
        }
    }

    /// Validate a raw request body.
    pub fn from_body(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::Validation(format!("invalid JSON body: {e}")))?;
        let Value::Object(mut fields) = value else {
            return Err(invalid("body must be a JSON object"));
        };

        let room = take_room(&mut fields)?;

        match fields.remove("payload") {
            Some(Value::String(payload)) if !payload.is_empty() => {
                let meta = take_meta(fields.remove("meta"))?;
                Ok(Self { room, payload, meta })
            }
            Some(Value::String(_)) => Err(invalid("payload must not be empty")),
            Some(Value::Null) | None if is_signed_envelope(&fields) => {
                let meta = fields
                    .get("envelope")
                    .and_then(|e| e.get("meta"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let meta = take_meta(Some(meta))?;
                let payload = serde_json::to_string(&fields)
                    .map_err(|e| RelayError::Internal(e.to_string()))?;
                Ok(Self { room, payload, meta })
            }
            Some(Value::Null) | None => Err(invalid("payload is required")),
            Some(_) => Err(invalid("payload must be a string")),
        }
    }
}

fn invalid(message: &str) -> RelayError {
    RelayError::Validation(message.to_string())
}

fn take_room(fields: &mut Map<String, Value>) -> Result<String, RelayError> {
    match fields.remove("room") {
        None | Some(Value::Null) => Ok(DEFAULT_ROOM.to_string()),
        Some(Value::String(room)) if !room.is_empty() => Ok(room),
        Some(_) => Err(invalid("room must be a non-empty string")),
    }
}

fn take_meta(meta: Option<Value>) -> Result<Value, RelayError> {
    match meta {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(meta @ Value::Object(_)) => Ok(meta),
        Some(_) => Err(invalid("meta must be an object")),
    }
}

fn is_signed_envelope(fields: &Map<String, Value>) -> bool {
    fields.get("envelope").is_some_and(Value::is_object)
        && fields.get("encrypted").is_some_and(Value::is_object)
}
