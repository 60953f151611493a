//! Document store abstraction.
//!
//! The core treats persistence as a collaborator: anything that can keep
//! JSON documents by `(collection, id)` and answer equality lookups on a few
//! named secondary indexes can back the tracker. A document and its index
//! entries are written together, atomically, by a single [`RecordStore::put`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures raised by a [`RecordStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage worker failed: {0}")]
    Worker(String),

    #[error("write to {collection}/{id} could not be verified")]
    Unverified { collection: String, id: String },
}

/// One secondary index entry attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexEntry {
    pub name: &'static str,
    pub key: String,
}

impl IndexEntry {
    pub fn new(name: &'static str, key: impl Into<String>) -> Self {
        Self { name, key: key.into() }
    }
}

/// Async key/document store with equality indexes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches a document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Inserts or replaces a document together with its index entries.
    ///
    /// Previous index entries of the same document are dropped, so callers
    /// always pass the complete set.
    async fn put(&self, collection: &str, id: &str, document: Value, index: Vec<IndexEntry>) -> Result<(), StoreError>;

    /// Returns every document of `collection` whose `index` equals `key`.
    async fn query(&self, collection: &str, index: &str, key: &str) -> Result<Vec<Value>, StoreError>;

    /// Returns every document of `collection`.
    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}
