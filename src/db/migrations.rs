//! Database schema migrations for the SQLite document store.
//!
//! Each migration has a version, a name and an `up` function executed inside
//! the migration transaction. Applied versions are recorded in the
//! `migrations` table so reopening a database only runs what is new.
//!
//! ```rust,no_run
//! use punchclock::db::migrations::{init_with_migrations, get_db_version};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("punchclock.db")?;
//! init_with_migrations(&mut conn)?;
//! let version = get_db_version(&conn)?;
//! # Ok::<(), rusqlite::Error>(())
//! ```

use rusqlite::{params, Connection, Result, Transaction};
use tracing::{debug, error, info};

const MIGRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: fn(&Transaction) -> Result<()>,
}

/// Ordered registry of schema migrations.
pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        // Version 1: document table keyed by (collection, id)
        self.add_migration(1, "create_documents", |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (collection, id)
                )",
                [],
            )?;
            Ok(())
        });

        // Version 2: secondary index rows (week bucket, job, person, ...)
        self.add_migration(2, "create_document_index", |tx| {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS document_index (
                    collection TEXT NOT NULL,
                    index_name TEXT NOT NULL,
                    index_key TEXT NOT NULL,
                    id TEXT NOT NULL,
                    PRIMARY KEY (collection, index_name, index_key, id),
                    FOREIGN KEY (collection, id) REFERENCES documents(collection, id) ON DELETE CASCADE
                )",
                [],
            )?;
            tx.execute(
                "CREATE INDEX IF NOT EXISTS idx_document_index_lookup ON document_index(collection, index_name, index_key)",
                [],
            )?;
            Ok(())
        });

        // Version 3: reverse lookup used when a document's index entries are replaced
        self.add_migration(3, "index_document_index_by_id", |tx| {
            tx.execute("CREATE INDEX IF NOT EXISTS idx_document_index_id ON document_index(collection, id)", [])?;
            Ok(())
        });
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: fn(&Transaction) -> Result<()>) {
        self.migrations.push(Migration { version, name, up });
    }

    pub fn run_migrations(&self, conn: &mut Connection) -> Result<()> {
        conn.execute(MIGRATIONS_TABLE, [])?;

        let current_version = self.get_current_version(conn)?;
        let pending: Vec<&Migration> = self.migrations.iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            debug!("database schema is up to date at version {}", current_version);
            return Ok(());
        }

        info!("applying {} database migration(s)", pending.len());
        let tx = conn.transaction()?;

        for migration in pending {
            debug!(version = migration.version, name = migration.name, "running migration");
            if let Err(e) = (migration.up)(&tx) {
                error!(version = migration.version, "migration failed: {}", e);
                return Err(e);
            }
            tx.execute(
                "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_current_version(&self, conn: &Connection) -> Result<u32> {
        let version: Option<u32> = conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }
}

pub fn init_with_migrations(conn: &mut Connection) -> Result<()> {
    MigrationManager::new().run_migrations(conn)
}

pub fn get_db_version(conn: &Connection) -> Result<u32> {
    MigrationManager::new().get_current_version(conn)
}

pub fn needs_migration(conn: &Connection) -> Result<bool> {
    let manager = MigrationManager::new();
    Ok(manager.get_current_version(conn)? < manager.latest_version())
}
