//! Main SnapshotRelay coordination.
//!
//! SnapshotRelay owns the snapshot store, the room registry and the
//! operational counters. It is built once at startup and shared with every
//! handler through an `Arc`.

use crate::config::Config;
use crate::error::{RelayError, Result, StorageError};
use crate::request::NewSnapshot;
use crate::rooms::{BroadcastReport, RoomRegistry};
use crate::storage::{MemoryStore, SnapshotStorage, WalStore};
use snap_types::{now_millis, ServerMessage, SnapshotId, SnapshotRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Attempts at allocating an unused snapshot id before giving up.
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Snapshots stored.
    pub snapshots_created_total: AtomicU64,
    /// Snapshots returned by id.
    pub snapshots_served_total: AtomicU64,
    /// Notifications enqueued to subscribers.
    pub broadcasts_delivered_total: AtomicU64,
    /// Notifications skipped because a subscriber queue was full or closed.
    pub broadcasts_dropped_total: AtomicU64,
    /// Rejected API keys (HTTP and WebSocket).
    pub auth_failures_total: AtomicU64,
    /// WAL lines loaded at startup.
    pub wal_lines_replayed_total: AtomicU64,
    /// WAL lines skipped at startup.
    pub wal_lines_skipped_total: AtomicU64,
    /// Subscribers accepted.
    pub subscribers_connected_total: AtomicU64,
}

/// Main relay server.
pub struct SnapshotRelay {
    config: Config,
    storage: Arc<dyn SnapshotStorage>,
    rooms: RoomRegistry,
    metrics: RelayMetrics,
    started: Instant,
}

impl std::fmt::Debug for SnapshotRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRelay")
            .field("config", &self.config)
            .field("rooms", &self.rooms)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SnapshotRelay {
    /// Create a relay over an existing storage backend.
    pub fn new(config: Config, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self {
            config,
            storage,
            rooms: RoomRegistry::new(),
            metrics: RelayMetrics::default(),
            started: Instant::now(),
        }
    }

    /// Create a relay from config, replaying the WAL when persistence is on.
    ///
    /// Replay completes before this returns, so no request can observe a
    /// half-loaded store.
    pub async fn open(config: Config) -> Result<Self> {
        if !config.persistence.enabled {
            tracing::info!("Persistence disabled, snapshots are memory-only");
            return Ok(Self::new(config, Arc::new(MemoryStore::new())));
        }

        let (store, report) = WalStore::open(&config.persistence.wal_file).await?;
        tracing::info!(
            "Replayed WAL {}: {} records loaded, {} lines skipped",
            config.persistence.wal_file.display(),
            report.applied,
            report.skipped
        );

        let relay = Self::new(config, Arc::new(store));
        relay
            .metrics
            .wal_lines_replayed_total
            .store(report.applied as u64, Ordering::Relaxed);
        relay
            .metrics
            .wal_lines_skipped_total
            .store(report.skipped as u64, Ordering::Relaxed);
        Ok(relay)
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Seconds since the relay was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Check a presented key for writes and subscriptions.
    ///
    /// Passes when no key is configured.
    pub fn authorize(&self, presented: Option<&str>) -> Result<()> {
        match self.config.auth.api_key.as_deref() {
            None => Ok(()),
            Some(expected) => self.check_key(expected, presented),
        }
    }

    /// Check a presented key for admin operations.
    ///
    /// Fails when no key is configured.
    pub fn authorize_admin(&self, presented: Option<&str>) -> Result<()> {
        match self.config.auth.api_key.as_deref() {
            None => {
                self.metrics.auth_failures_total.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Rejected admin request: no API key configured");
                Err(RelayError::Unauthorized)
            }
            Some(expected) => self.check_key(expected, presented),
        }
    }

    fn check_key(&self, expected: &str, presented: Option<&str>) -> Result<()> {
        if presented == Some(expected) {
            return Ok(());
        }
        self.metrics.auth_failures_total.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Rejected request: {} API key",
            if presented.is_some() { "wrong" } else { "missing" }
        );
        Err(RelayError::Unauthorized)
    }

    /// Store a new snapshot and notify its room.
    ///
    /// A fresh id is drawn for each attempt; an id that is already taken is
    /// never overwritten.
    pub async fn create_snapshot(&self, new: NewSnapshot) -> Result<SnapshotId> {
        let ts = now_millis();

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let record = SnapshotRecord {
                id: SnapshotId::random(),
                room: new.room.clone(),
                payload: new.payload.clone(),
                meta: new.meta.clone(),
                ts,
            };
            let summary = record.summary();

            match self.storage.insert(record).await {
                Ok(()) => {
                    self.metrics
                        .snapshots_created_total
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        "Stored snapshot id={} room={} payload_len={}",
                        summary.id,
                        summary.room,
                        new.payload.len()
                    );
                    let id = summary.id;
                    let room = summary.room.clone();
                    self.broadcast(&room, &ServerMessage::Snapshot { record: summary });
                    return Ok(id);
                }
                Err(StorageError::DuplicateId { id }) => {
                    tracing::warn!("Snapshot id collision on {} (attempt {})", id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RelayError::Internal(format!(
            "no unused snapshot id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    /// Send a server message to every subscriber in `room`.
    pub fn broadcast(&self, room: &str, message: &ServerMessage) -> BroadcastReport {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize broadcast for room={}: {}", room, e);
                return BroadcastReport::default();
            }
        };

        let report = self.rooms.broadcast(room, &text);
        self.metrics
            .broadcasts_delivered_total
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.metrics
            .broadcasts_dropped_total
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        report
    }

    /// Fetch a full record, payload included.
    ///
    /// Ids that do not parse are reported as not found.
    pub async fn snapshot(&self, id: &str) -> Result<SnapshotRecord> {
        let not_found = || RelayError::NotFound { id: id.to_string() };
        let parsed: SnapshotId = id.parse().map_err(|_| not_found())?;
        let record = self.storage.get(&parsed).await?.ok_or_else(not_found)?;
        self.metrics
            .snapshots_served_total
            .fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    /// Number of stored snapshots.
    pub async fn snapshot_count(&self) -> Result<usize> {
        Ok(self.storage.count().await?)
    }

    /// Drop every snapshot, and the WAL file when persistence is on.
    pub async fn clear(&self) -> Result<()> {
        self.storage.clear().await?;
        tracing::warn!("All snapshots cleared by admin request");
        Ok(())
    }
}
