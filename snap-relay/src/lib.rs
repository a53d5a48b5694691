//! # snap-relay
//!
//! Broker-blind snapshot relay for blindsnap.
//!
//! The relay:
//! - Accepts opaque snapshot payloads over HTTP and stores them by id
//! - Notifies WebSocket subscribers of a room about each new snapshot
//! - Optionally persists records to an append-only JSON-lines WAL
//! - Never parses or decrypts payloads (it is a "dumb pipe")
//!
//! ## Architecture
//!
//! ```text
//! Publisher ──POST /snapshots──┐         ┌──/ws?room=demo── Subscriber
//!                              ▼         │
//!        ┌──────────────────────────────────────┐
//!        │             snap-relay               │
//!        │  snapshot store ──► room registry    │
//!        │        │                             │
//!        │        ▼                             │
//!        │  relay-wal.jsonl (optional)          │
//!        └──────────────────────────────────────┘
//! ```
//!
//! ## Subscriber frames
//!
//! - connect → `{type:"welcome", room, ts}`
//! - new snapshot → `{type:"snapshot", record:{id, room, meta, ts}}` (no payload)
//! - `ping` → `{type:"pong", ts}`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod rooms;
pub mod server;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{RelayError, StorageError};
pub use http::build_router;
pub use server::SnapshotRelay;
