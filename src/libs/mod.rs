//! Core library modules for punchclock.
//!
//! - **Infrastructure**: configuration, settings, data storage, messages, errors
//! - **Time model**: week bucketing, clocks, work sessions, time logs
//! - **Live state**: session manager, active task tracker, weekly stats
//! - **Output**: formatting, reports, streaming export
//!
//! ```rust,no_run
//! use punchclock::libs::week::week_bucket_key;
//! use chrono::{TimeZone, Utc, Weekday};
//!
//! let ts = Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap();
//! assert_eq!(week_bucket_key(ts, chrono_tz::UTC, Weekday::Mon), "2025-01-06");
//! ```

pub mod clock;
pub mod config;
pub mod data_storage;
pub mod error;
pub mod export;
pub mod formatter;
pub mod messages;
pub mod notify;
pub mod observer;
pub mod outbox;
pub mod report;
pub mod session;
pub mod session_manager;
pub mod settings;
pub mod stats;
pub mod ticker;
pub mod time_log;
pub mod tracker;
pub mod view;
pub mod week;
