//! Wiring shared by every command.

use crate::db::db::Db;
use crate::db::time_logs::TimeLogs;
use crate::libs::clock::{SharedClock, SystemClock};
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::notify::{ConsoleNotifier, SharedNotifier};
use crate::libs::outbox::{FileQueue, SharedQueue};
use crate::libs::session_manager::WorkSessionManager;
use crate::libs::settings::SettingsProvider;
use crate::libs::stats::StatsAggregator;
use crate::libs::tracker::ActiveTaskTracker;
use crate::msg_bail_anyhow;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub db: Db,
    pub settings: SettingsProvider,
    pub clock: SharedClock,
    pub time_logs: TimeLogs,
    pub stats: Arc<StatsAggregator>,
    pub sessions: WorkSessionManager,
    pub tasks: ActiveTaskTracker,
}

impl App {
    /// The on-disk application: SQLite store, file-backed offline queue, console output.
    pub async fn open() -> Result<App> {
        let config = Config::read()?;
        let db = Db::open()?;
        let queue: SharedQueue = Arc::new(FileQueue::open_default()?);
        let notifier: SharedNotifier = Arc::new(ConsoleNotifier);
        Self::build(config, db, queue, notifier, SystemClock::shared()).await
    }

    /// Assembles the services and restores any open session.
    pub async fn build(config: Config, db: Db, queue: SharedQueue, notifier: SharedNotifier, clock: SharedClock) -> Result<App> {
        let settings = SettingsProvider::new(config.settings.clone());
        let stats = Arc::new(StatsAggregator::new(
            db.clone(),
            settings.clone(),
            clock.clone(),
            config.tracker.job_totals,
            Some(config.tracker.person_id.clone()),
        )?);
        stats.initialize(false).await?;

        let time_logs = TimeLogs::new(db.clone(), settings.clone(), clock.clone()).with_hook(stats.clone());
        let sessions = WorkSessionManager::new(
            db.clone(),
            time_logs.clone(),
            settings.clone(),
            clock.clone(),
            config.tracker.clone(),
            queue,
            notifier.clone(),
        )
        .with_stats(stats.clone());
        sessions.recover().await?;

        let tasks = ActiveTaskTracker::new(
            db.clone(),
            time_logs.clone(),
            clock.clone(),
            notifier,
            &config.tracker.person_id,
            &config.tracker.default_job_id,
        );

        Ok(App {
            config,
            db,
            settings,
            clock,
            time_logs,
            stats,
            sessions,
            tasks,
        })
    }

    pub fn tz(&self) -> Result<Tz> {
        Ok(self.settings.get().tz()?)
    }
}

/// Finds the single id starting with `prefix`.
pub fn resolve_prefix<'a, I>(prefix: &str, ids: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => msg_bail_anyhow!(Message::NoMatchingId(prefix.to_string())),
        _ => msg_bail_anyhow!(Message::AmbiguousId(prefix.to_string())),
    }
}

/// Parses `YYYY-MM-DD HH:MM` or `YYYY-MM-DD` (midnight) in `tz`.
pub fn parse_local(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = match NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M") {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")?.and_time(NaiveTime::MIN),
    };
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => anyhow::bail!("{} does not exist in {}", input, tz),
    }
}
