//! SQLite-backed document store.
//!
//! Documents are stored as JSON text in `documents`; their secondary index
//! entries live in `document_index`. A `put` replaces both inside one
//! transaction, which is the atomic single-record write the tracker relies
//! on. Blocking SQLite calls run on the tokio blocking pool.

use crate::db::migrations::init_with_migrations;
use crate::db::store::{IndexEntry, RecordStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const SELECT_DOCUMENT: &str = "SELECT body FROM documents WHERE collection = ?1 AND id = ?2";
const UPSERT_DOCUMENT: &str = "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
    ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";
const DELETE_INDEX: &str = "DELETE FROM document_index WHERE collection = ?1 AND id = ?2";
const INSERT_INDEX: &str = "INSERT OR IGNORE INTO document_index (collection, index_name, index_key, id) VALUES (?1, ?2, ?3, ?4)";
const SELECT_BY_INDEX: &str = "SELECT d.body FROM document_index i
    JOIN documents d ON d.collection = i.collection AND d.id = i.id
    WHERE i.collection = ?1 AND i.index_name = ?2 AND i.index_key = ?3
    ORDER BY d.id";
const SELECT_COLLECTION: &str = "SELECT body FROM documents WHERE collection = ?1 ORDER BY id";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies pending migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("sqlite journal mode: {}", mode);
        init_with_migrations(&mut conn)?;
        debug!("document store opened at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        init_with_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

fn collect_bodies(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Value>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
    let mut documents = Vec::new();
    for body in rows {
        documents.push(serde_json::from_str(&body?)?);
    }
    Ok(documents)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.with_conn(move |conn| {
            let body: Option<String> = conn.query_row(SELECT_DOCUMENT, params![collection, id], |row| row.get(0)).optional()?;
            match body {
                Some(body) => Ok(Some(serde_json::from_str(&body)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, collection: &str, id: &str, document: Value, index: Vec<IndexEntry>) -> Result<(), StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        let body = serde_json::to_string(&document)?;
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(UPSERT_DOCUMENT, params![collection, id, body])?;
            tx.execute(DELETE_INDEX, params![collection, id])?;
            for entry in &index {
                tx.execute(INSERT_INDEX, params![collection, entry.name, entry.key, id])?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query(&self, collection: &str, index: &str, key: &str) -> Result<Vec<Value>, StoreError> {
        let (collection, index, key) = (collection.to_string(), index.to_string(), key.to_string());
        self.with_conn(move |conn| collect_bodies(conn, SELECT_BY_INDEX, &[&collection, &index, &key])).await
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collection = collection.to_string();
        self.with_conn(move |conn| collect_bodies(conn, SELECT_COLLECTION, &[&collection])).await
    }
}
