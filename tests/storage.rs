mod common;

#[cfg(test)]
mod tests {
    use super::common::at;
    use chrono::Duration;
    use punchclock::commands::app::App;
    use punchclock::db::db::Db;
    use punchclock::db::sqlite::SqliteStore;
    use punchclock::libs::clock::{ManualClock, SharedClock};
    use punchclock::libs::config::Config;
    use punchclock::libs::notify::MemoryNotifier;
    use punchclock::libs::outbox::{FileQueue, OfflineQueue, PendingWrite, SharedQueue};
    use punchclock::libs::session::{ClockIn, DurationWarning, SessionStatus};
    use punchclock::libs::time_log::TimeLogFilter;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use test_context::{test_context, AsyncTestContext, TestContext};

    struct StorageContext {
        temp_dir: TempDir,
    }

    impl TestContext for StorageContext {
        fn setup() -> Self {
            StorageContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    struct AppContext {
        temp_dir: TempDir,
        clock: Arc<ManualClock>,
    }

    impl AsyncTestContext for AppContext {
        async fn setup() -> Self {
            AppContext {
                temp_dir: tempfile::tempdir().unwrap(),
                clock: Arc::new(ManualClock::new(at(2025, 1, 8, 9, 0))),
            }
        }
    }

    impl AppContext {
        async fn open(&self) -> App {
            let store = SqliteStore::open(&self.temp_dir.path().join("punchclock.db")).unwrap();
            let queue: SharedQueue = Arc::new(FileQueue::new(self.temp_dir.path().join("outbox.jsonl")));
            App::build(
                Config::default(),
                Db::new(Arc::new(store)),
                queue,
                Arc::new(MemoryNotifier::new()),
                self.clock.clone() as SharedClock,
            )
            .await
            .unwrap()
        }
    }

    #[test_context(StorageContext)]
    #[test]
    fn test_file_queue_survives_reopen(ctx: &mut StorageContext) {
        let path = ctx.temp_dir.path().join("outbox.jsonl");
        let first = PendingWrite::new("work_session", "clock_out", json!({"id": "a"}), at(2025, 1, 8, 9, 0));
        let second = PendingWrite::new("work_session", "clock_out", json!({"id": "b"}), at(2025, 1, 8, 10, 0));
        {
            let queue = FileQueue::new(path.clone());
            queue.enqueue(first.clone()).unwrap();
            queue.enqueue(second.clone()).unwrap();
            queue.record_attempt(&first.id).unwrap();
        }

        let queue = FileQueue::new(path);
        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].payload, json!({"id": "b"}));

        queue.remove(&first.id).unwrap();
        assert_eq!(queue.pending().unwrap(), vec![second]);
    }

    #[test_context(StorageContext)]
    #[test]
    fn test_missing_queue_file_is_empty(ctx: &mut StorageContext) {
        let queue = FileQueue::new(ctx.temp_dir.path().join("nothing-here.jsonl"));
        assert!(queue.pending().unwrap().is_empty());
    }

    #[test_context(AppContext)]
    #[tokio::test]
    async fn test_session_survives_process_restart(ctx: &mut AppContext) {
        let app = ctx.open().await;
        let session = app.sessions.clock_in(ClockIn::default()).await.unwrap();
        ctx.clock.advance(Duration::minutes(20));
        app.sessions.start_break().await.unwrap();
        app.sessions.shutdown();
        drop(app);

        ctx.clock.advance(Duration::minutes(10));
        let app = ctx.open().await;
        let recovered = app.sessions.current_session().unwrap();
        assert_eq!(recovered.id, session.id);
        assert_eq!(recovered.status, SessionStatus::OnBreak);

        app.sessions.end_break().await.unwrap();
        ctx.clock.advance(Duration::minutes(40));
        app.sessions.clock_out(&|_: &DurationWarning| true).await.unwrap();
        app.sessions.shutdown();
        drop(app);

        let app = ctx.open().await;
        assert!(app.sessions.current_session().is_none());
        let logs = app.time_logs.fetch(TimeLogFilter::ByWeek("2025-01-06".into())).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].duration_minutes, 60);
        assert_eq!(app.stats.snapshot().week_total_minutes, 60);
    }
}
