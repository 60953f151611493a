//! Reactive week settings.
//!
//! [`SettingsProvider`] holds the current `{timezone, week_start,
//! weekly_target_hours}` and notifies subscribers on every change. Bucketing
//! reads it on each call; the stats aggregator subscribes to recompute its
//! current-week label and target.

use crate::libs::error::TrackerError;
use crate::libs::observer::{Observers, Subscription};
use chrono::Weekday;
use chrono_tz::Tz;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// IANA time zone name, e.g. `Europe/Berlin`.
    pub timezone: String,
    pub week_start: Weekday,
    pub weekly_target_hours: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            timezone: "UTC".to_string(),
            week_start: Weekday::Mon,
            weekly_target_hours: 40.0,
        }
    }
}

impl Settings {
    pub fn tz(&self) -> Result<Tz, TrackerError> {
        parse_tz(&self.timezone)
    }

    pub fn target_minutes(&self) -> i64 {
        (self.weekly_target_hours * 60.0).round() as i64
    }
}

pub fn parse_tz(name: &str) -> Result<Tz, TrackerError> {
    name.parse::<Tz>()
        .map_err(|_| TrackerError::Settings(format!("unknown time zone '{}'", name)))
}

#[derive(Clone)]
pub struct SettingsProvider {
    current: Arc<RwLock<Settings>>,
    observers: Arc<Observers<Settings>>,
}

impl SettingsProvider {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: Arc::new(RwLock::new(settings)),
            observers: Arc::new(Observers::new()),
        }
    }

    pub fn get(&self) -> Settings {
        self.current.read().clone()
    }

    /// Replaces the settings after validating the time zone.
    pub fn update(&self, settings: Settings) -> Result<(), TrackerError> {
        settings.tz()?;
        if settings.weekly_target_hours < 0.0 || !settings.weekly_target_hours.is_finite() {
            return Err(TrackerError::Settings(format!(
                "weekly target must be a non-negative number, got {}",
                settings.weekly_target_hours
            )));
        }
        *self.current.write() = settings.clone();
        debug!(timezone = %settings.timezone, week_start = %settings.week_start, "settings updated");
        self.observers.publish(&settings);
        Ok(())
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Settings) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }
}

impl Default for SettingsProvider {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
