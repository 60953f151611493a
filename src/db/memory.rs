//! In-process document store.
//!
//! Keeps documents in ordered maps behind a `parking_lot` mutex. Used for
//! ephemeral runs and in tests, where [`MemoryStore::set_available`] simulates
//! an unreachable backend.

use crate::db::store::{IndexEntry, RecordStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

type Key = (String, String);

#[derive(Default)]
struct Tables {
    documents: BTreeMap<Key, Value>,
    index: BTreeMap<Key, Vec<IndexEntry>>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    available: AtomicBool,
    failing: Mutex<BTreeSet<String>>,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            available: AtomicBool::new(true),
            failing: Mutex::new(BTreeSet::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// While unavailable every write fails with [`StoreError::Unavailable`];
    /// reads keep working.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes writes to one collection fail while every other collection keeps working.
    pub fn fail_writes_to(&self, collection: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(collection.to_string());
        } else {
            set.remove(collection);
        }
    }

    /// Number of successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.documents.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn put(&self, collection: &str, id: &str, document: Value, index: Vec<IndexEntry>) -> Result<(), StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        if self.failing.lock().contains(collection) {
            return Err(StoreError::Unavailable(format!("writes to {} are failing", collection)));
        }
        let key = (collection.to_string(), id.to_string());
        let mut tables = self.tables.lock();
        tables.documents.insert(key.clone(), document);
        tables.index.insert(key, index);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, collection: &str, index: &str, key: &str) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock();
        let found = tables
            .index
            .iter()
            .filter(|((c, _), entries)| c == collection && entries.iter().any(|e| e.name == index && e.key == key))
            .filter_map(|(doc_key, _)| tables.documents.get(doc_key).cloned())
            .collect();
        Ok(found)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .documents
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, value)| value.clone())
            .collect())
    }
}
