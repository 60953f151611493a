mod common;

#[cfg(test)]
mod tests {
    use super::common::{at, Harness};
    use chrono::{DateTime, Duration, Utc, Weekday};
    use punchclock::db::stats_cache::StatsCache;
    use punchclock::libs::config::{Config, JobTotalsMode};
    use punchclock::libs::session::ClockIn;
    use punchclock::libs::settings::Settings;
    use punchclock::libs::time_log::{NewTimeLog, TimeLogSource, TimeLogUpdate};

    fn entry(job: &str, start: DateTime<Utc>, minutes: i64) -> NewTimeLog {
        NewTimeLog {
            person_id: "me".to_string(),
            job_id: job.to_string(),
            task_id: None,
            start,
            end: start + Duration::minutes(minutes),
            duration_minutes: minutes,
            break_ms: 0,
            billable: true,
            note: None,
            source: TimeLogSource::Manual,
        }
    }

    #[tokio::test]
    async fn test_delete_reverses_delta() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        let log = h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 90)).await.unwrap();

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_bucket, "2025-01-06");
        assert_eq!(stats.week_total_minutes, 90);
        assert_eq!(stats.job_minutes.get("acme"), Some(&90));

        h.app.time_logs.soft_delete(&log.id).await.unwrap();
        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 0);
        assert!(stats.job_minutes.is_empty());
    }

    #[tokio::test]
    async fn test_incremental_totals_match_full_recompute() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        let a = h.app.time_logs.create(entry("acme", at(2025, 1, 6, 9, 0), 120)).await.unwrap();
        h.app.time_logs.create(entry("acme", at(2025, 1, 7, 9, 0), 45)).await.unwrap();
        h.app.time_logs.create(entry("globex", at(2025, 1, 8, 9, 0), 30)).await.unwrap();
        let old = h.app.time_logs.create(entry("globex", at(2024, 12, 31, 9, 0), 60)).await.unwrap();
        let moved = h.app.time_logs.create(entry("acme", at(2025, 1, 9, 9, 0), 15)).await.unwrap();

        h.app
            .time_logs
            .update(
                &a.id,
                TimeLogUpdate {
                    duration_minutes: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        h.app
            .time_logs
            .update(
                &moved.id,
                TimeLogUpdate {
                    job_id: Some("globex".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        h.app.time_logs.soft_delete(&old.id).await.unwrap();

        let incremental = h.app.stats.snapshot();
        assert_eq!(incremental.week_total_minutes, 100 + 45 + 30 + 15);
        assert_eq!(incremental.job_minutes.get("acme"), Some(&145));
        assert_eq!(incremental.job_minutes.get("globex"), Some(&45));

        let recomputed = h.app.stats.recompute_all().await.unwrap();
        assert_eq!(recomputed.week_total_minutes, incremental.week_total_minutes);
        assert_eq!(recomputed.job_minutes, incremental.job_minutes);

        let again = h.app.stats.recompute_all().await.unwrap();
        assert_eq!(again.week_total_minutes, recomputed.week_total_minutes);
        assert_eq!(again.job_minutes, recomputed.job_minutes);
    }

    #[tokio::test]
    async fn test_moving_a_log_into_another_week() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        let log = h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 90)).await.unwrap();
        assert_eq!(h.app.stats.snapshot().week_total_minutes, 90);

        let moved = h
            .app
            .time_logs
            .update(
                &log.id,
                TimeLogUpdate {
                    start: Some(at(2024, 12, 31, 9, 0)),
                    end: Some(at(2024, 12, 31, 10, 30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.week_bucket, "2024-12-30");

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 0);
        assert_eq!(stats.job_minutes.get("acme"), Some(&90));

        let recomputed = h.app.stats.recompute_all().await.unwrap();
        assert_eq!(recomputed.week_total_minutes, 0);
        assert_eq!(recomputed.job_minutes, stats.job_minutes);

        // and back again
        h.app
            .time_logs
            .update(
                &log.id,
                TimeLogUpdate {
                    start: Some(at(2025, 1, 9, 9, 0)),
                    end: Some(at(2025, 1, 9, 10, 30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 90);
        assert_eq!(stats.job_minutes.get("acme"), Some(&90));
    }

    #[tokio::test]
    async fn test_week_recompute_is_repeatable() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2025, 1, 6, 9, 0), 120)).await.unwrap();
        h.app.time_logs.create(entry("globex", at(2025, 1, 8, 9, 0), 30)).await.unwrap();
        h.app.time_logs.create(entry("acme", at(2024, 12, 31, 9, 0), 60)).await.unwrap();
        let incremental = h.app.stats.snapshot();

        let first = h.app.stats.recompute_week_aggregates(None, "2025-01-06").await.unwrap();
        let second = h.app.stats.recompute_week_aggregates(None, "2025-01-06").await.unwrap();
        assert_eq!(first.total_minutes, 150);
        assert_eq!(second.total_minutes, first.total_minutes);
        assert_eq!(second.job_minutes, first.job_minutes);
        assert_eq!(first.total_minutes, incremental.week_total_minutes);

        let after = h.app.stats.snapshot();
        assert_eq!(after.week_total_minutes, incremental.week_total_minutes);
        assert_eq!(after.job_minutes, incremental.job_minutes);
    }

    #[tokio::test]
    async fn test_all_time_job_totals_include_past_weeks() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2024, 12, 31, 9, 0), 60)).await.unwrap();
        h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 30)).await.unwrap();

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 30);
        assert_eq!(stats.job_minutes.get("acme"), Some(&90));
    }

    #[tokio::test]
    async fn test_current_week_job_totals() {
        let mut config = Config::default();
        config.tracker.job_totals = JobTotalsMode::CurrentWeek;
        let h = Harness::with_config(config, at(2025, 1, 10, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2024, 12, 31, 9, 0), 60)).await.unwrap();
        h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 30)).await.unwrap();

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.job_totals, JobTotalsMode::CurrentWeek);
        assert_eq!(stats.job_minutes.get("acme"), Some(&30));
        assert_eq!(h.app.stats.recompute_all().await.unwrap().job_minutes.get("acme"), Some(&30));
    }

    #[tokio::test]
    async fn test_week_rollover_resets_week_total() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 30)).await.unwrap();
        assert_eq!(h.app.stats.snapshot().week_total_minutes, 30);

        h.clock.set_wall(at(2025, 1, 14, 12, 0));
        h.app.time_logs.create(entry("acme", at(2025, 1, 13, 9, 0), 20)).await.unwrap();

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_bucket, "2025-01-13");
        assert_eq!(stats.week_total_minutes, 20);
        assert_eq!(stats.job_minutes.get("acme"), Some(&50));
    }

    #[tokio::test]
    async fn test_backfill_walks_back_week_by_week() {
        let h = Harness::new(at(2025, 1, 22, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2025, 1, 21, 9, 0), 10)).await.unwrap();
        h.app.time_logs.create(entry("acme", at(2025, 1, 14, 9, 0), 20)).await.unwrap();
        h.app.time_logs.create(entry("globex", at(2025, 1, 7, 9, 0), 30)).await.unwrap();

        let mut seen = Vec::new();
        let totals = h
            .app
            .stats
            .backfill_weekly_totals(4, |progress| seen.push((progress.done, progress.week.clone())))
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (1, "2025-01-20".to_string()),
                (2, "2025-01-13".to_string()),
                (3, "2025-01-06".to_string()),
                (4, "2024-12-30".to_string()),
            ]
        );
        let minutes: Vec<i64> = totals.iter().map(|t| t.total_minutes).collect();
        assert_eq!(minutes, vec![10, 20, 30, 0]);

        let history = StatsCache::new(h.app.db.clone()).weekly_history().await.unwrap();
        assert_eq!(history.first().unwrap().week_bucket, "2024-12-30");
        let week = StatsCache::new(h.app.db.clone())
            .weekly(Some("me"), "2025-01-06")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(week.job_minutes.get("globex"), Some(&30));
    }

    #[tokio::test]
    async fn test_other_people_are_out_of_scope() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        let mut theirs = entry("acme", at(2025, 1, 8, 9, 0), 60);
        theirs.person_id = "bob".to_string();
        h.app.time_logs.create(theirs).await.unwrap();

        assert_eq!(h.app.stats.snapshot().week_total_minutes, 0);
        assert_eq!(h.app.stats.recompute_all().await.unwrap().week_total_minutes, 0);
    }

    #[tokio::test]
    async fn test_cache_survives_restart() {
        let h = Harness::new(at(2025, 1, 10, 12, 0)).await;
        h.app.time_logs.create(entry("acme", at(2025, 1, 8, 9, 0), 75)).await.unwrap();

        let app = h.restart().await;
        let stats = app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 75);
        assert_eq!(stats.live_minutes, 0);
    }

    #[tokio::test]
    async fn test_running_session_counts_live() {
        let mut config = Config::default();
        config.tracker.tick_interval_ms = 5;
        let h = Harness::with_config(config, at(2025, 1, 8, 9, 0)).await;
        h.app.time_logs.create(entry("acme", at(2025, 1, 7, 9, 0), 60)).await.unwrap();

        h.app.sessions.clock_in(ClockIn::default()).await.unwrap();
        h.advance_minutes(30);
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.week_total_minutes, 60);
        assert_eq!(stats.live_minutes, 30);
        assert_eq!(stats.displayed_week_minutes(), 90);
        h.app.sessions.shutdown();
    }

    #[tokio::test]
    async fn test_settings_change_refreshes_target_and_label() {
        let h = Harness::new(at(2025, 1, 12, 12, 0)).await; // a Sunday
        assert_eq!(h.app.stats.snapshot().week_bucket, "2025-01-06");
        let _watch = h.app.stats.watch_settings();

        h.app
            .settings
            .update(Settings {
                week_start: Weekday::Sun,
                weekly_target_hours: 32.0,
                ..Settings::default()
            })
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let stats = h.app.stats.snapshot();
        assert_eq!(stats.target_minutes, 32 * 60);
        assert_eq!(stats.week_bucket, "2025-01-12");
    }
}
