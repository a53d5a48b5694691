//! Room membership and broadcast fan-out.
//!
//! Each subscriber owns a bounded outbound queue drained by its socket
//! writer task. Broadcast only ever does a non-blocking enqueue, so a slow
//! or dead subscriber cannot stall the publisher or other subscribers.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Identifier of one registered subscriber.
pub type SubscriberId = u64;

/// A frame queued for a subscriber's socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text frame (serialized server message).
    Text(String),
    /// Close the socket with this code and reason, then stop writing.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers whose queue accepted the frame.
    pub delivered: usize,
    /// Subscribers skipped because their queue was full or closed.
    pub dropped: usize,
}

/// Registry of rooms and their subscribers.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashMap<SubscriberId, mpsc::Sender<Outbound>>>,
    next_id: AtomicU64,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber to `room`, creating the room on first use.
    pub fn register(&self, room: &str, sender: mpsc::Sender<Outbound>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut members = self.rooms.entry(room.to_string()).or_default();
        members.insert(id, sender);

        tracing::debug!(
            "Subscriber {} joined room={} (total: {})",
            id,
            room,
            members.len()
        );
        id
    }

    /// Remove a subscriber. Rooms left without subscribers are dropped.
    pub fn unregister(&self, room: &str, id: SubscriberId) {
        let remaining = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(&id);
                members.len()
            }
            None => return,
        };

        if remaining == 0 {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }

        tracing::debug!(
            "Subscriber {} left room={} (remaining: {})",
            id,
            room,
            remaining
        );
    }

    /// Enqueue `text` for every subscriber currently in `room`.
    ///
    /// Fire-and-forget: nothing waits for the socket write.
    pub fn broadcast(&self, room: &str, text: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let Some(members) = self.rooms.get(room) else {
            return report;
        };

        for (id, sender) in members.iter() {
            match sender.try_send(Outbound::Text(text.to_string())) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!("Dropped broadcast to subscriber {}: {}", id, e);
                    report.dropped += 1;
                }
            }
        }
        report
    }

    /// Names of rooms with at least one subscriber, sorted.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of subscribers in `room`.
    pub fn subscriber_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// Number of subscribers across all rooms.
    pub fn total_subscribers(&self) -> usize {
        self.rooms.iter().map(|e| e.value().len()).sum()
    }

    /// Number of rooms with at least one subscriber.
    pub fn total_rooms(&self) -> usize {
        self.rooms.len()
    }
}
