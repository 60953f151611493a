#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc, Weekday};
use punchclock::commands::app::App;
use punchclock::db::db::Db;
use punchclock::db::memory::MemoryStore;
use punchclock::libs::clock::{ManualClock, SharedClock};
use punchclock::libs::config::Config;
use punchclock::libs::notify::MemoryNotifier;
use punchclock::libs::outbox::MemoryQueue;
use punchclock::libs::settings::Settings;
use std::sync::Arc;

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// A fully wired application over in-memory collaborators.
pub struct Harness {
    pub app: App,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub queue: Arc<MemoryQueue>,
    pub notifier: Arc<MemoryNotifier>,
}

impl Harness {
    pub async fn new(start: DateTime<Utc>) -> Self {
        Self::with_config(Config::default(), start).await
    }

    pub async fn in_zone(timezone: &str, week_start: Weekday, start: DateTime<Utc>) -> Self {
        let mut config = Config::default();
        config.settings = Settings {
            timezone: timezone.to_string(),
            week_start,
            ..Settings::default()
        };
        Self::with_config(config, start).await
    }

    pub async fn with_config(config: Config, start: DateTime<Utc>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start));
        let queue = Arc::new(MemoryQueue::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let app = App::build(
            config,
            Db::new(store.clone()),
            queue.clone(),
            notifier.clone(),
            clock.clone() as SharedClock,
        )
        .await
        .unwrap();
        Harness {
            app,
            store,
            clock,
            queue,
            notifier,
        }
    }

    /// A second process over the same store, queue and clock.
    pub async fn restart(&self) -> App {
        self.app.sessions.shutdown();
        App::build(
            self.app.config.clone(),
            Db::new(self.store.clone()),
            self.queue.clone(),
            self.notifier.clone(),
            self.clock.clone() as SharedClock,
        )
        .await
        .unwrap()
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(chrono::Duration::minutes(minutes));
    }
}
