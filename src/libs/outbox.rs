//! Offline write queue.
//!
//! When a primary write cannot reach the store, the payload is parked here
//! and replayed later (`punchclock sync`). [`FileQueue`] keeps one JSON
//! document per line in the data directory.

use crate::db::store::StoreError;
use crate::libs::data_storage::DataStorage;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const OUTBOX_FILE_NAME: &str = "outbox.jsonl";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PendingWrite {
    pub id: String,
    /// Entity kind, e.g. `work_session`.
    pub entity: String,
    pub operation: String,
    pub payload: Value,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
}

impl PendingWrite {
    pub fn new(entity: &str, operation: &str, payload: Value, queued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity: entity.to_string(),
            operation: operation.to_string(),
            payload,
            queued_at,
            attempts: 0,
        }
    }
}

pub trait OfflineQueue: Send + Sync {
    fn enqueue(&self, write: PendingWrite) -> Result<(), StoreError>;

    /// Queued writes in insertion order.
    fn pending(&self) -> Result<Vec<PendingWrite>, StoreError>;

    fn remove(&self, id: &str) -> Result<(), StoreError>;

    fn record_attempt(&self, id: &str) -> Result<(), StoreError>;
}

pub type SharedQueue = Arc<dyn OfflineQueue>;

#[derive(Default)]
pub struct MemoryQueue {
    writes: Mutex<Vec<PendingWrite>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OfflineQueue for MemoryQueue {
    fn enqueue(&self, write: PendingWrite) -> Result<(), StoreError> {
        self.writes.lock().push(write);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingWrite>, StoreError> {
        Ok(self.writes.lock().clone())
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.writes.lock().retain(|w| w.id != id);
        Ok(())
    }

    fn record_attempt(&self, id: &str) -> Result<(), StoreError> {
        if let Some(write) = self.writes.lock().iter_mut().find(|w| w.id == id) {
            write.attempts += 1;
        }
        Ok(())
    }
}

pub struct FileQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileQueue {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    /// Queue file in the platform data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(DataStorage::new().get_path(OUTBOX_FILE_NAME)?))
    }

    fn read_all(&self) -> Result<Vec<PendingWrite>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    fn write_all(&self, writes: &[PendingWrite]) -> Result<(), StoreError> {
        let mut buffer = String::new();
        for write in writes {
            buffer.push_str(&serde_json::to_string(write)?);
            buffer.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, buffer)?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl OfflineQueue for FileQueue {
    fn enqueue(&self, write: PendingWrite) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&write)?)?;
        debug!(id = %write.id, entity = %write.entity, "write queued offline");
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingWrite>, StoreError> {
        let _guard = self.lock.lock();
        self.read_all()
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut writes = self.read_all()?;
        writes.retain(|w| w.id != id);
        self.write_all(&writes)
    }

    fn record_attempt(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut writes = self.read_all()?;
        for write in writes.iter_mut().filter(|w| w.id == id) {
            write.attempts += 1;
        }
        self.write_all(&writes)
    }
}
