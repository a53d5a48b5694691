//! In-memory snapshot map.

use super::SnapshotStorage;
use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snap_types::{SnapshotId, SnapshotRecord};

/// Concurrent in-memory snapshot map keyed by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<SnapshotId, SnapshotRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Used by WAL replay only.
    pub fn restore(&self, record: SnapshotRecord) {
        self.records.insert(record.id, record);
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStore {
    async fn insert(&self, record: SnapshotRecord) -> Result<(), StorageError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(StorageError::DuplicateId {
                id: record.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, StorageError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.records.clear();
        Ok(())
    }
}
