#[cfg(test)]
mod tests {
    use chrono::Weekday;
    use punchclock::libs::config::{Config, JobTotalsMode, CONFIG_FILE_NAME};
    use punchclock::libs::data_storage::DataStorage;
    use punchclock::libs::settings::{Settings, SettingsProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    /// Points the data directory at a temporary home.
    struct ConfigTestContext {
        _temp_dir: TempDir,
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            std::env::set_var("HOME", temp_dir.path());
            std::env::set_var("LOCALAPPDATA", temp_dir.path());
            ConfigTestContext { _temp_dir: temp_dir }
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.settings.timezone, "UTC");
        assert_eq!(config.settings.week_start, Weekday::Mon);
        assert_eq!(config.settings.target_minutes(), 2400);
        assert_eq!(config.tracker.person_id, "me");
        assert_eq!(config.tracker.job_totals, JobTotalsMode::AllTime);
        assert!(config.tracker.export_chunk_rows > 0);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"settings": {"timezone": "Europe/Berlin", "week_start": "Sun", "weekly_target_hours": 32.5},
                "tracker": {"job_totals": "current_week"}}"#,
        )
        .unwrap();
        assert_eq!(config.settings.week_start, Weekday::Sun);
        assert_eq!(config.settings.target_minutes(), 1950);
        assert_eq!(config.tracker.job_totals, JobTotalsMode::CurrentWeek);
        assert_eq!(config.tracker.default_job_id, "general");
    }

    // HOME is process-wide, so everything touching the data directory stays in one test.
    #[test_context(ConfigTestContext)]
    #[test]
    fn test_read_and_save_in_data_directory(_ctx: &mut ConfigTestContext) {
        assert_eq!(Config::read().unwrap(), Config::default());

        let mut config = Config::default();
        config.settings.timezone = "America/New_York".to_string();
        config.tracker.person_id = "ana".to_string();
        config.tracker.tick_interval_ms = 250;
        config.save().unwrap();

        let path = DataStorage::new().get_path(CONFIG_FILE_NAME).unwrap();
        assert!(path.exists());
        assert_eq!(Config::read().unwrap(), config);
    }

    #[test]
    fn test_modules_list() {
        let keys: Vec<String> = Config::modules().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["settings", "tracker"]);
    }

    #[test]
    fn test_settings_provider_validates_and_notifies() {
        let provider = SettingsProvider::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let subscription = provider.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let err = provider
            .update(Settings {
                timezone: "Mars/Olympus".to_string(),
                ..Settings::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "SETTINGS");
        assert_eq!(provider.get(), Settings::default());

        provider
            .update(Settings {
                week_start: Weekday::Sat,
                ..Settings::default()
            })
            .unwrap();
        assert_eq!(provider.get().week_start, Weekday::Sat);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        provider.update(Settings::default()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
