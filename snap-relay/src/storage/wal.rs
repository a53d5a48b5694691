//! Write-ahead log persistence.
//!
//! One JSON-serialized [`SnapshotRecord`] per line, append-only, no header.
//! There is no compaction or rotation, so replay time grows with history.

use super::{MemoryStore, SnapshotStorage};
use crate::error::StorageError;
use async_trait::async_trait;
use snap_types::{SnapshotId, SnapshotRecord};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Outcome of replaying a WAL file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Lines parsed and loaded.
    pub applied: usize,
    /// Lines that failed to parse and were skipped.
    pub skipped: usize,
}

/// Append-only WAL file.
///
/// The handle is opened lazily so that appends after [`Wal::remove`]
/// recreate the file instead of writing to an unlinked inode. Opening
/// terminates a torn final line so the next record starts on its own line.
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl Wal {
    /// Create a WAL writer for `path`. Does not touch the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Path of the WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a JSON line and flush it.
    pub async fn append(&self, record: &SnapshotRecord) -> Result<(), StorageError> {
        let mut line = record.to_json_line()?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_for_append().await?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }
        Ok(())
    }

    async fn open_for_append(&self) -> Result<File, StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                tracing::warn!(
                    "WAL {} ends in a torn line, terminating it before appending",
                    self.path.display()
                );
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
        }
        Ok(file)
    }

    /// Delete the WAL file. A missing file is not an error.
    pub async fn remove(&self) -> Result<(), StorageError> {
        let mut guard = self.file.lock().await;
        guard.take();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replay the WAL into `store`, in file order.
    ///
    /// Lines that are not valid UTF-8 or not a valid record are logged and
    /// skipped; they never abort the replay. Blank lines are ignored. A
    /// missing file replays as empty.
    pub async fn replay_into(&self, store: &MemoryStore) -> Result<ReplayReport, StorageError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No WAL at {}, starting empty", self.path.display());
                return Ok(ReplayReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut report = ReplayReport::default();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Skipping WAL line {}: not UTF-8 ({})", line_no, e);
                    report.skipped += 1;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match SnapshotRecord::from_json_line(line) {
                Ok(record) => {
                    store.restore(record);
                    report.applied += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping WAL line {}: {}", line_no, e);
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Memory store backed by a write-ahead log.
#[derive(Debug)]
pub struct WalStore {
    memory: MemoryStore,
    wal: Wal,
    // Held across the memory and WAL steps of insert and clear
    writes: Mutex<()>,
}

impl WalStore {
    /// Replay the WAL at `path` and return a store ready for appends.
    pub async fn open(path: impl Into<PathBuf>) -> Result<(Self, ReplayReport), StorageError> {
        let wal = Wal::new(path);
        let memory = MemoryStore::new();
        let report = wal.replay_into(&memory).await?;
        let store = Self {
            memory,
            wal,
            writes: Mutex::new(()),
        };
        Ok((store, report))
    }

    /// The underlying WAL.
    pub fn wal(&self) -> &Wal {
        &self.wal
    }
}

#[async_trait]
impl SnapshotStorage for WalStore {
    /// Store in memory, then append to the WAL.
    ///
    /// Not transactional: if the append fails the record stays in memory
    /// and the error is returned.
    async fn insert(&self, record: SnapshotRecord) -> Result<(), StorageError> {
        let _writes = self.writes.lock().await;
        self.memory.insert(record.clone()).await?;
        if let Err(e) = self.wal.append(&record).await {
            tracing::error!("WAL append failed for {}: {}", record.id, e);
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, StorageError> {
        self.memory.get(id).await
    }

    async fn count(&self) -> Result<usize, StorageError> {
        self.memory.count().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _writes = self.writes.lock().await;
        self.memory.clear().await?;
        self.wal.remove().await
    }
}
