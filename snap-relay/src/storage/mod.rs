//! Storage layer for snap-relay.
//!
//! Snapshots live in memory. With persistence enabled every insert is also
//! appended to a line-delimited JSON write-ahead log that is replayed on
//! startup.

mod memory;
mod wal;

pub use memory::MemoryStore;
pub use wal::{ReplayReport, Wal, WalStore};

use crate::error::StorageResult;
use async_trait::async_trait;
use snap_types::{SnapshotId, SnapshotRecord};

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Store a new record.
    ///
    /// Rejects with [`crate::error::StorageError::DuplicateId`] if the id is taken; an
    /// existing record is never overwritten.
    async fn insert(&self, record: SnapshotRecord) -> StorageResult<()>;

    /// Get a record by id.
    async fn get(&self, id: &SnapshotId) -> StorageResult<Option<SnapshotRecord>>;

    /// Number of records held.
    async fn count(&self) -> StorageResult<usize>;

    /// Remove every record, including any durable copy. Irreversible.
    async fn clear(&self) -> StorageResult<()>;
}
