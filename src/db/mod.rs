//! Persistence layer.
//!
//! Records are JSON documents grouped into collections and looked up by id
//! or by secondary index entries. [`db::Db`] is the typed front end; the
//! backends implement [`store::RecordStore`]:
//!
//! - [`sqlite::SqliteStore`]: the on-disk store, schema managed by [`migrations`]
//! - [`memory::MemoryStore`]: in-process store with a switch for simulated outages
//!
//! ```rust,no_run
//! use punchclock::db::db::Db;
//!
//! let db = Db::open()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Typed document access over a shared record store.
pub mod db;

/// Record store trait and its error type.
pub mod store;

pub mod memory;

/// Versioned schema for the SQLite store.
pub mod migrations;

pub mod sqlite;

/// Time log persistence with validation, overlap checks and change hooks.
pub mod time_logs;

pub mod work_sessions;

pub mod active_tasks;

/// Cached weekly statistics and per-week totals.
pub mod stats_cache;
