//! # snap-types
//!
//! Wire format types for the blindsnap encrypted snapshot relay.
//!
//! This crate provides the foundational types shared by the client SDK and
//! the broker:
//! - [`SnapshotId`] - 96-bit random record identifier
//! - [`SnapshotRecord`] / [`SnapshotSummary`] - stored record and its
//!   payload-free broadcast view
//! - [`ServerMessage`] / [`ClientMessage`] - WebSocket frames
//! - [`CreateSnapshotResponse`], [`HealthResponse`], [`RoomsResponse`] - HTTP bodies
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod api;
mod error;
mod ids;
mod messages;
mod record;

pub use api::{
    ClearResponse, CreateSnapshotResponse, ErrorBody, HealthResponse, RoomsResponse,
    DEFAULT_ROOM,
};
pub use error::TypesError;
pub use ids::{now_millis, SnapshotId, SNAPSHOT_ID_LEN};
pub use messages::{ClientMessage, ServerMessage};
pub use record::{SnapshotRecord, SnapshotSummary};
