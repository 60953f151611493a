use crate::db::memory::MemoryStore;
use crate::db::sqlite::SqliteStore;
use crate::db::store::{IndexEntry, RecordStore, StoreError};
use crate::libs::data_storage::DataStorage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const DB_FILE_NAME: &str = "punchclock.db";

/// A record type that lives in its own collection of the document store.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Secondary index entries written alongside the document.
    fn index(&self) -> Vec<IndexEntry> {
        Vec::new()
    }
}

/// Typed handle over a shared [`RecordStore`].
///
/// Cloning is cheap; every clone talks to the same store.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn RecordStore>,
}

impl Db {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Opens the SQLite database in the platform data directory.
    pub fn open() -> anyhow::Result<Db> {
        let db_file_path = DataStorage::new().get_path(DB_FILE_NAME)?;
        let store = SqliteStore::open(&db_file_path)?;
        Ok(Db::new(Arc::new(store)))
    }

    /// An ephemeral store that lives as long as the process.
    pub fn in_memory() -> Db {
        Db::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Document>(&self, document: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(document)?;
        self.store.put(T::COLLECTION, document.id(), value, document.index()).await
    }

    pub async fn query<T: Document>(&self, index: &str, key: &str) -> Result<Vec<T>, StoreError> {
        decode_all(self.store.query(T::COLLECTION, index, key).await?)
    }

    pub async fn scan<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        decode_all(self.store.scan(T::COLLECTION).await?)
    }
}

fn decode_all<T: DeserializeOwned>(values: Vec<serde_json::Value>) -> Result<Vec<T>, StoreError> {
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(StoreError::from))
        .collect()
}
