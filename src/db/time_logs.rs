//! Time log repository.
//!
//! Creates, edits and soft-deletes [`TimeLog`] records. Every write is
//! validated before it reaches the store; a create is read back to make sure
//! it landed. After each successful write the attached [`TimeLogHook`] (the
//! stats aggregator in practice) is told what changed. Hook failures only
//! affect derived data and are logged.

use crate::db::db::Db;
use crate::db::store::StoreError;
use crate::libs::clock::SharedClock;
use crate::libs::error::{Result, TrackerError};
use crate::libs::settings::{parse_tz, SettingsProvider};
use crate::libs::time_log::{
    job_week_key, validate_span, NewTimeLog, TimeLog, TimeLogEvent, TimeLogFilter, TimeLogSource, TimeLogUpdate,
    INDEX_JOB, INDEX_JOB_WEEK, INDEX_PERSON, INDEX_WEEK,
};
use crate::libs::week::week_bucket_key;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Receives every committed time log change.
#[async_trait]
pub trait TimeLogHook: Send + Sync {
    async fn on_time_log_changed(&self, event: TimeLogEvent, new: Option<&TimeLog>, old: Option<&TimeLog>) -> Result<()>;
}

#[derive(Clone)]
pub struct TimeLogs {
    db: Db,
    settings: SettingsProvider,
    clock: SharedClock,
    hook: Option<Arc<dyn TimeLogHook>>,
}

impl TimeLogs {
    pub fn new(db: Db, settings: SettingsProvider, clock: SharedClock) -> Self {
        Self {
            db,
            settings,
            clock,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn TimeLogHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub async fn create(&self, entry: NewTimeLog) -> Result<TimeLog> {
        validate_span(
            &entry.person_id,
            &entry.job_id,
            entry.start,
            entry.end,
            entry.duration_minutes,
            entry.break_ms,
        )?;

        let settings = self.settings.get();
        let tz = settings.tz()?;
        let now = self.clock.now();
        let log = TimeLog {
            id: Uuid::new_v4().to_string(),
            person_id: entry.person_id,
            job_id: entry.job_id,
            task_id: entry.task_id,
            start: entry.start,
            end: entry.end,
            duration_minutes: entry.duration_minutes,
            break_ms: entry.break_ms,
            billable: entry.billable,
            week_bucket: week_bucket_key(entry.start, tz, settings.week_start),
            timezone: settings.timezone,
            week_start: settings.week_start,
            invoice_id: None,
            note: entry.note,
            source: entry.source,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.check_overlap(&log).await?;
        self.db.put(&log).await?;

        let stored: Option<TimeLog> = self.db.get(&log.id).await?;
        if stored.as_ref() != Some(&log) {
            return Err(StoreError::Unverified {
                collection: "time_logs".to_string(),
                id: log.id,
            }
            .into());
        }
        debug!(id = %log.id, week = %log.week_bucket, minutes = log.duration_minutes, "time log created");

        self.notify(TimeLogEvent::Created, Some(&log), None).await;
        Ok(log)
    }

    pub async fn update(&self, id: &str, update: TimeLogUpdate) -> Result<TimeLog> {
        let old = self.require(id).await?;
        if old.is_deleted() {
            return Err(TrackerError::validation(format!("time log {} is deleted", id)));
        }

        let mut log = old.clone();
        if let Some(invoice_id) = update.invoice_id.clone() {
            match &old.invoice_id {
                Some(existing) if *existing != invoice_id => {
                    return Err(TrackerError::validation(format!(
                        "time log {} is already linked to invoice {}",
                        id, existing
                    )));
                }
                _ => log.invoice_id = Some(invoice_id),
            }
        }
        if let Some(job_id) = update.job_id.clone() {
            log.job_id = job_id;
        }
        if let Some(task_id) = update.task_id.clone() {
            log.task_id = task_id;
        }
        if let Some(note) = update.note.clone() {
            log.note = note;
        }
        if let Some(billable) = update.billable {
            log.billable = billable;
        }
        if let Some(start) = update.start {
            log.start = start;
        }
        if let Some(end) = update.end {
            log.end = end;
        }
        if let Some(minutes) = update.duration_minutes {
            log.duration_minutes = minutes;
        }
        if let Some(break_ms) = update.break_ms {
            log.break_ms = break_ms;
        }

        if update.touches_span() || update.job_id.is_some() {
            validate_span(&log.person_id, &log.job_id, log.start, log.end, log.duration_minutes, log.break_ms)?;
        }
        if log.start != old.start {
            // keep the basis the log was created with
            let tz = parse_tz(&log.timezone)?;
            log.week_bucket = week_bucket_key(log.start, tz, log.week_start);
        }
        if update.touches_span() {
            self.check_overlap(&log).await?;
        }

        log.updated_at = self.clock.now();
        self.db.put(&log).await?;
        debug!(id = %log.id, "time log updated");

        self.notify(TimeLogEvent::Updated, Some(&log), Some(&old)).await;
        Ok(log)
    }

    pub async fn link_invoice(&self, id: &str, invoice_id: &str) -> Result<TimeLog> {
        self.update(id, TimeLogUpdate::link_invoice(invoice_id)).await
    }

    /// Marks a log deleted. Deleting an already deleted log is a no-op.
    pub async fn soft_delete(&self, id: &str) -> Result<TimeLog> {
        let old = self.require(id).await?;
        if old.is_deleted() {
            return Ok(old);
        }
        let mut log = old.clone();
        let now = self.clock.now();
        log.deleted_at = Some(now);
        log.updated_at = now;
        self.db.put(&log).await?;
        debug!(id = %log.id, "time log deleted");

        self.notify(TimeLogEvent::Deleted, None, Some(&old)).await;
        Ok(log)
    }

    pub async fn get(&self, id: &str) -> Result<Option<TimeLog>> {
        Ok(self.db.get(id).await?)
    }

    /// Non-deleted logs matching `filter`, ordered by start.
    pub async fn fetch(&self, filter: TimeLogFilter) -> Result<Vec<TimeLog>> {
        let mut logs = self.fetch_with_deleted(filter).await?;
        logs.retain(|log| !log.is_deleted());
        Ok(logs)
    }

    pub async fn fetch_with_deleted(&self, filter: TimeLogFilter) -> Result<Vec<TimeLog>> {
        let mut logs: Vec<TimeLog> = match filter {
            TimeLogFilter::All => self.db.scan().await?,
            TimeLogFilter::ByJob(job) => self.db.query(INDEX_JOB, &job).await?,
            TimeLogFilter::ByWeek(week) => self.db.query(INDEX_WEEK, &week).await?,
            TimeLogFilter::ByJobWeek(job, week) => self.db.query(INDEX_JOB_WEEK, &job_week_key(&job, &week)).await?,
            TimeLogFilter::ByPerson(person) => self.db.query(INDEX_PERSON, &person).await?,
        };
        logs.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(logs)
    }

    async fn require(&self, id: &str) -> Result<TimeLog> {
        self.get(id).await?.ok_or_else(|| TrackerError::not_found("time log", id))
    }

    async fn check_overlap(&self, log: &TimeLog) -> Result<()> {
        if log.source == TimeLogSource::ActiveTask {
            return Ok(());
        }
        let existing = self.fetch(TimeLogFilter::ByPerson(log.person_id.clone())).await?;
        if let Some(conflict) = existing
            .iter()
            .find(|other| other.id != log.id && other.is_exclusive() && other.overlaps(log.start, log.end))
        {
            return Err(TrackerError::Overlap {
                person_id: log.person_id.clone(),
                conflicting_id: conflict.id.clone(),
            });
        }
        Ok(())
    }

    async fn notify(&self, event: TimeLogEvent, new: Option<&TimeLog>, old: Option<&TimeLog>) {
        if let Some(hook) = &self.hook {
            if let Err(e) = hook.on_time_log_changed(event, new, old).await {
                warn!(?event, "stats update after time log change failed: {}", e);
            }
        }
    }
}
