mod common;

#[cfg(test)]
mod tests {
    use super::common::{at, Harness};
    use chrono::Duration;
    use punchclock::libs::messages::Message;
    use punchclock::libs::notify::Level;
    use punchclock::libs::session::ClockIn;
    use punchclock::libs::time_log::{TimeLogFilter, TimeLogSource};
    use punchclock::libs::tracker::{CompleteTask, StartTask, TaskStatus, MAX_TASKS};

    fn named(name: &str) -> StartTask {
        StartTask {
            name: name.to_string(),
            billable: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fifth_task_is_rejected() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        for i in 0..MAX_TASKS {
            h.app.tasks.start(named(&format!("task {i}"))).await.unwrap();
        }
        let err = h.app.tasks.start(named("one too many")).await.unwrap_err();
        assert_eq!(err.code(), "INVARIANT_VIOLATION");
        assert_eq!(h.app.tasks.list().await.unwrap().len(), MAX_TASKS);
        assert!(h.notifier.sent().contains(&(Level::Warning, Message::TaskLimitReached(MAX_TASKS))));

        // a retired task frees a slot
        let first = h.app.tasks.list().await.unwrap()[0].id.clone();
        h.app.tasks.delete(&first).await.unwrap();
        h.app.tasks.start(named("now it fits")).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        let err = h.app.tasks.start(named("   ")).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(h.app.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pause_excludes_time() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        let task = h.app.tasks.start(named("review")).await.unwrap();
        h.advance_minutes(20);
        let paused = h.app.tasks.pause(&task.id).await.unwrap();
        assert_eq!(paused.status, TaskStatus::Paused);
        assert_eq!(paused.elapsed_ms, 20 * 60_000);

        h.advance_minutes(30);
        assert_eq!(h.app.tasks.pause(&task.id).await.unwrap_err().code(), "INVALID_TRANSITION");
        h.app.tasks.resume(&task.id).await.unwrap();
        h.advance_minutes(10);

        let done = h.app.tasks.complete(&task.id, CompleteTask::default()).await.unwrap();
        assert_eq!(done.time_log.duration_minutes, 30);
        assert_eq!(done.time_log.source, TimeLogSource::ActiveTask);
        assert_eq!(done.time_log.end, at(2025, 1, 8, 10, 0));
        assert_eq!(done.time_log.start, at(2025, 1, 8, 9, 30));
        assert_eq!(done.time_log.note.as_deref(), Some("review"));
        assert_eq!(done.task.status, TaskStatus::Completed);
        assert!(h.app.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_reminds_about_running_tasks() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        let a = h.app.tasks.start(named("a")).await.unwrap();
        let b = h.app.tasks.start(named("b")).await.unwrap();
        let c = h.app.tasks.start(named("c")).await.unwrap();
        h.app.tasks.pause(&c.id).await.unwrap();
        h.advance_minutes(15);

        let done = h.app.tasks.complete(&a.id, CompleteTask::default()).await.unwrap();
        assert_eq!(done.still_running.len(), 1);
        assert_eq!(done.still_running[0].id, b.id);
        assert!(h
            .notifier
            .sent()
            .contains(&(Level::Info, Message::TasksStillRunning(vec!["b".to_string()]))));
    }

    #[tokio::test]
    async fn test_task_logs_coexist_with_session() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        h.app.sessions.clock_in(ClockIn::default()).await.unwrap();
        let task = h.app.tasks.start(named("parallel")).await.unwrap();
        h.clock.advance(Duration::minutes(25));

        h.app.tasks.complete(&task.id, CompleteTask::default()).await.unwrap();
        h.app
            .sessions
            .clock_out(&|_: &punchclock::libs::session::DurationWarning| true)
            .await
            .unwrap();

        let logs = h.app.time_logs.fetch(TimeLogFilter::ByWeek("2025-01-06".into())).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(h.app.stats.snapshot().week_total_minutes, 50);
    }

    #[tokio::test]
    async fn test_deleted_task_logs_nothing() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        let task = h.app.tasks.start(named("scratch")).await.unwrap();
        h.advance_minutes(10);
        h.app.tasks.delete(&task.id).await.unwrap();

        assert_eq!(h.app.tasks.complete(&task.id, CompleteTask::default()).await.unwrap_err().code(), "NOT_FOUND");
        assert!(h.app.time_logs.fetch(TimeLogFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_completion_can_be_retried() {
        let h = Harness::new(at(2025, 1, 8, 9, 0)).await;
        let task = h.app.tasks.start(named("flaky")).await.unwrap();
        h.advance_minutes(30);

        h.store.fail_writes_to("active_tasks", true);
        let err = h.app.tasks.complete(&task.id, CompleteTask::default()).await.unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_FAILURE");
        assert!(h.app.time_logs.fetch(TimeLogFilter::All).await.unwrap().is_empty());
        assert_eq!(h.app.stats.snapshot().week_total_minutes, 0);
        assert_eq!(h.app.tasks.list().await.unwrap().len(), 1);

        h.store.fail_writes_to("active_tasks", false);
        let done = h.app.tasks.complete(&task.id, CompleteTask::default()).await.unwrap();
        assert_eq!(done.time_log.duration_minutes, 30);
        assert_eq!(h.app.time_logs.fetch(TimeLogFilter::All).await.unwrap().len(), 1);
        assert_eq!(h.app.stats.snapshot().week_total_minutes, 30);
        assert!(h.app.tasks.list().await.unwrap().is_empty());
    }
}
