//! Concurrent named tasks, tracked independently of the work session.
//!
//! Up to [`MAX_TASKS`] tasks may be running or paused at once. Elapsed time
//! is kept in wall-clock milliseconds: a pause folds the current run into
//! `elapsed_ms`, a resume starts a new run. Completing a task turns it into a
//! time log and retires it.

use crate::db::active_tasks::ActiveTasks;
use crate::db::db::{Db, Document};
use crate::db::store::IndexEntry;
use crate::db::time_logs::TimeLogs;
use crate::libs::clock::SharedClock;
use crate::libs::error::{Result, TrackerError};
use crate::libs::messages::Message;
use crate::libs::notify::{Level, SharedNotifier};
use crate::libs::session::round_minutes;
use crate::libs::time_log::{NewTimeLog, TimeLog, TimeLogSource};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};
use uuid::Uuid;

pub const MAX_TASKS: usize = 4;
pub const INDEX_PERSON: &str = "person";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Running => "running",
            TaskStatus::Paused => "paused",
            TaskStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActiveTask {
    pub id: String,
    pub person_id: String,
    pub job_id: String,
    pub task_id: Option<String>,
    pub name: String,
    /// Start of the current run; meaningful while running.
    pub run_started_at: DateTime<Utc>,
    pub status: TaskStatus,
    /// Milliseconds of finished runs.
    pub elapsed_ms: i64,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub time_log_id: Option<String>,
}

impl Document for ActiveTask {
    const COLLECTION: &'static str = "active_tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn index(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::new(INDEX_PERSON, self.person_id.as_str())]
    }
}

impl ActiveTask {
    /// Counts against [`MAX_TASKS`].
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none() && self.status != TaskStatus::Completed
    }

    pub fn elapsed_ms_at(&self, now: DateTime<Utc>) -> i64 {
        match self.status {
            TaskStatus::Running => self.elapsed_ms + (now - self.run_started_at).num_milliseconds().max(0),
            _ => self.elapsed_ms,
        }
    }

    pub fn elapsed_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        round_minutes(self.elapsed_ms_at(now))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartTask {
    pub job_id: Option<String>,
    pub task_id: Option<String>,
    pub name: String,
    pub billable: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompleteTask {
    pub note: Option<String>,
    /// Overrides the billable flag given at start.
    pub billable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCompletion {
    pub task: ActiveTask,
    pub time_log: TimeLog,
    /// Other tasks still running after this one was completed.
    pub still_running: Vec<ActiveTask>,
}

pub struct ActiveTaskTracker {
    tasks: ActiveTasks,
    time_logs: TimeLogs,
    clock: SharedClock,
    notifier: SharedNotifier,
    person_id: String,
    default_job_id: String,
}

impl ActiveTaskTracker {
    pub fn new(
        db: Db,
        time_logs: TimeLogs,
        clock: SharedClock,
        notifier: SharedNotifier,
        person_id: &str,
        default_job_id: &str,
    ) -> Self {
        Self {
            tasks: ActiveTasks::new(db),
            time_logs,
            clock,
            notifier,
            person_id: person_id.to_string(),
            default_job_id: default_job_id.to_string(),
        }
    }

    /// Running and paused tasks, oldest first.
    pub async fn list(&self) -> Result<Vec<ActiveTask>> {
        Ok(self.tasks.live_for(&self.person_id).await?)
    }

    pub async fn start(&self, request: StartTask) -> Result<ActiveTask> {
        let name = request.name.trim();
        if name.is_empty() {
            self.notifier.notify(Level::Warning, Message::TaskNameEmpty);
            return Err(TrackerError::validation("task name is required"));
        }
        let live = self.list().await?;
        if live.len() >= MAX_TASKS {
            self.notifier.notify(Level::Warning, Message::TaskLimitReached(MAX_TASKS));
            return Err(TrackerError::InvariantViolation(format!(
                "{} tasks are already being tracked",
                live.len()
            )));
        }

        let now = self.clock.now();
        let task = ActiveTask {
            id: Uuid::new_v4().to_string(),
            person_id: self.person_id.clone(),
            job_id: request.job_id.unwrap_or_else(|| self.default_job_id.clone()),
            task_id: request.task_id,
            name: name.to_string(),
            run_started_at: now,
            status: TaskStatus::Running,
            elapsed_ms: 0,
            billable: request.billable,
            created_at: now,
            deleted_at: None,
            time_log_id: None,
        };
        self.tasks.put(&task).await?;
        debug!(task = %task.id, "task started");
        self.notifier.notify(Level::Success, Message::TaskStarted(task.name.clone()));
        Ok(task)
    }

    pub async fn pause(&self, id: &str) -> Result<ActiveTask> {
        let mut task = self.require(id).await?;
        if task.status != TaskStatus::Running {
            return Err(invalid("pause", &task));
        }
        let now = self.clock.now();
        task.elapsed_ms = task.elapsed_ms_at(now);
        task.status = TaskStatus::Paused;
        self.tasks.put(&task).await?;
        self.notifier.notify(Level::Info, Message::TaskPaused(task.name.clone()));
        Ok(task)
    }

    pub async fn resume(&self, id: &str) -> Result<ActiveTask> {
        let mut task = self.require(id).await?;
        if task.status != TaskStatus::Paused {
            return Err(invalid("resume", &task));
        }
        task.run_started_at = self.clock.now();
        task.status = TaskStatus::Running;
        self.tasks.put(&task).await?;
        self.notifier.notify(Level::Info, Message::TaskResumed(task.name.clone()));
        Ok(task)
    }

    /// Logs the tracked time and retires the task.
    ///
    /// The time log ends now and starts far enough back to cover the tracked
    /// minutes.
    pub async fn complete(&self, id: &str, request: CompleteTask) -> Result<TaskCompletion> {
        let mut task = self.require(id).await?;
        let now = self.clock.now();
        let total_ms = task.elapsed_ms_at(now);
        let minutes = round_minutes(total_ms).max(1);
        let span_ms = total_ms.max(minutes * 60_000);

        let time_log = self
            .time_logs
            .create(NewTimeLog {
                person_id: task.person_id.clone(),
                job_id: task.job_id.clone(),
                task_id: task.task_id.clone(),
                start: now - Duration::milliseconds(span_ms),
                end: now,
                duration_minutes: minutes,
                break_ms: 0,
                billable: request.billable.unwrap_or(task.billable),
                note: request.note.or_else(|| Some(task.name.clone())),
                source: TimeLogSource::ActiveTask,
            })
            .await?;

        task.elapsed_ms = total_ms;
        task.status = TaskStatus::Completed;
        task.deleted_at = Some(now);
        task.time_log_id = Some(time_log.id.clone());
        if let Err(e) = self.tasks.put(&task).await {
            // task is still live, so its log goes too
            if let Err(undo) = self.time_logs.soft_delete(&time_log.id).await {
                error!(task = %task.id, time_log = %time_log.id, "could not withdraw time log of unfinished completion: {}", undo);
            }
            return Err(e.into());
        }
        debug!(task = %task.id, minutes, "task completed");
        self.notifier
            .notify(Level::Success, Message::TaskCompleted(task.name.clone(), minutes));

        let still_running: Vec<ActiveTask> = self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.status == TaskStatus::Running)
            .collect();
        if !still_running.is_empty() {
            self.notifier.notify(
                Level::Info,
                Message::TasksStillRunning(still_running.iter().map(|t| t.name.clone()).collect()),
            );
        }

        Ok(TaskCompletion {
            task,
            time_log,
            still_running,
        })
    }

    /// Discards a task without logging its time.
    pub async fn delete(&self, id: &str) -> Result<ActiveTask> {
        let mut task = self.require(id).await?;
        task.deleted_at = Some(self.clock.now());
        self.tasks.put(&task).await?;
        self.notifier.notify(Level::Info, Message::TaskDeleted(task.name.clone()));
        Ok(task)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ActiveTask>> {
        Ok(self.tasks.get(id).await?)
    }

    async fn require(&self, id: &str) -> Result<ActiveTask> {
        match self.tasks.get(id).await? {
            Some(task) if task.is_live() => Ok(task),
            _ => Err(TrackerError::not_found("active task", id)),
        }
    }
}

fn invalid(action: &'static str, task: &ActiveTask) -> TrackerError {
    TrackerError::InvalidTransition {
        action,
        status: task.status.to_string(),
    }
}
