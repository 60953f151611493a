//! Configuration management for punchclock.
//!
//! The configuration is a JSON file in the platform data directory (see
//! [`DataStorage`]). A missing file yields defaults, so the tracker works
//! without any setup; `punchclock init` runs an interactive wizard that edits
//! the selected sections.
//!
//! ## Sections
//!
//! - **settings**: time zone, first day of the week and weekly target. These
//!   drive week bucketing and the weekly total shown by `stats`.
//! - **tracker**: who is tracking, the default job and the thresholds used by
//!   the session timer and the exporter.
//!
//! ```rust,no_run
//! use punchclock::libs::config::Config;
//!
//! let config = Config::read()?;
//! println!("weeks start on {}", config.settings.week_start);
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::libs::settings::{parse_tz, Settings};
use crate::libs::week::DEFAULT_MAX_SESSION_HOURS;
use crate::{msg_error, msg_print};
use anyhow::Result;
use chrono::Weekday;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// A configurable section offered by the setup wizard.
#[derive(Debug, Clone)]
pub struct ConfigModule {
    pub key: String,
    pub name: String,
}

/// Which records feed the per-job totals of the cached stats.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobTotalsMode {
    /// Cumulative minutes across every non-deleted time log.
    #[default]
    AllTime,
    /// Minutes of the current week only.
    CurrentWeek,
}

/// Timer and tracking parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Person id stamped on every session, task and time log.
    pub person_id: String,

    /// Job used by `in` and `task start` when none is given.
    pub default_job_id: String,

    /// Sessions longer than this need explicit confirmation at clock-out.
    pub max_session_hours: f64,

    /// Period of the live display tick in milliseconds.
    pub tick_interval_ms: u64,

    pub job_totals: JobTotalsMode,

    /// Rows per chunk when streaming exports.
    pub export_chunk_rows: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            person_id: "me".to_string(),
            default_job_id: "general".to_string(),
            max_session_hours: DEFAULT_MAX_SESSION_HOURS,
            tick_interval_ms: 1000,
            job_totals: JobTotalsMode::AllTime,
            export_chunk_rows: 500,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    pub tracker: TrackerConfig,
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl Config {
    /// Loads the configuration, falling back to defaults when no file exists.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        if !config_file_path.exists() {
            return Ok(Config::default());
        }
        let config_str = fs::read_to_string(config_file_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    pub fn modules() -> Vec<ConfigModule> {
        vec![
            ConfigModule {
                key: "settings".to_string(),
                name: Message::ConfigModuleSettings.to_string(),
            },
            ConfigModule {
                key: "tracker".to_string(),
                name: Message::ConfigModuleTracker.to_string(),
            },
        ]
    }

    /// Interactive setup; returns the edited configuration without saving it.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();
        let modules = Self::modules();

        let selected = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&modules.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for &selection in &selected {
            match modules[selection].key.as_str() {
                "settings" => config.settings = Self::init_settings(&config.settings)?,
                "tracker" => config.tracker = Self::init_tracker(&config.tracker)?,
                _ => {}
            }
        }

        Ok(config)
    }

    fn init_settings(default: &Settings) -> Result<Settings> {
        msg_print!(Message::ConfigModuleSettings);
        let timezone = loop {
            let name: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptTimezone.to_string())
                .default(default.timezone.clone())
                .interact_text()?;
            if parse_tz(&name).is_ok() {
                break name;
            }
            msg_error!(Message::InvalidTimezone(name));
        };

        let current = WEEKDAYS.iter().position(|d| *d == default.week_start).unwrap_or(0);
        let week_start = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptWeekStart.to_string())
            .items(&WEEKDAYS.iter().map(|d| d.to_string()).collect::<Vec<_>>())
            .default(current)
            .interact()?;

        Ok(Settings {
            timezone,
            week_start: WEEKDAYS[week_start],
            weekly_target_hours: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptWeeklyTarget.to_string())
                .default(default.weekly_target_hours)
                .interact_text()?,
        })
    }

    fn init_tracker(default: &TrackerConfig) -> Result<TrackerConfig> {
        msg_print!(Message::ConfigModuleTracker);
        Ok(TrackerConfig {
            person_id: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptPersonId.to_string())
                .default(default.person_id.clone())
                .interact_text()?,
            default_job_id: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptDefaultJob.to_string())
                .default(default.default_job_id.clone())
                .interact_text()?,
            max_session_hours: Input::with_theme(&ColorfulTheme::default())
                .with_prompt(Message::PromptMaxSessionHours.to_string())
                .default(default.max_session_hours)
                .interact_text()?,
            ..default.clone()
        })
    }
}
