//! # Punchclock
//!
//! A command-line time tracker built around weekly totals.
//!
//! ## Features
//!
//! - **Work Sessions**: clock in and out with breaks, a live timer, and
//!   recovery after a restart
//! - **Active Tasks**: up to four named timers running side by side
//! - **Time Logs**: validated, overlap-free records bucketed by week in the
//!   configured time zone
//! - **Weekly Stats**: incremental totals per week and per job, with full
//!   recompute and backfill
//! - **Offline Queue**: failed clock-out writes are kept and replayed later
//! - **Reports and Export**: time, invoice, profit and pipeline reports;
//!   chunked CSV and JSON export
//!
//! ## Usage
//!
//! ```rust,no_run
//! use punchclock::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod db;
pub mod libs;
