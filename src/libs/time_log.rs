//! Time log records: one finished span of work.

use crate::db::db::Document;
use crate::db::store::IndexEntry;
use crate::libs::error::TrackerError;
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub const INDEX_JOB: &str = "job";
pub const INDEX_WEEK: &str = "week";
pub const INDEX_JOB_WEEK: &str = "job_week";
pub const INDEX_PERSON: &str = "person";

/// Where a time log came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeLogSource {
    Session,
    ActiveTask,
    Manual,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeLog {
    pub id: String,
    pub person_id: String,
    pub job_id: String,
    pub task_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub break_ms: i64,
    pub billable: bool,
    pub week_bucket: String,
    /// Time zone the week bucket was derived with.
    pub timezone: String,
    /// First day of the week the bucket was derived with.
    pub week_start: Weekday,
    pub invoice_id: Option<String>,
    pub note: Option<String>,
    pub source: TimeLogSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TimeLog {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start.max(start) < self.end.min(end)
    }

    /// Whether this log takes part in the per-person overlap rule.
    pub fn is_exclusive(&self) -> bool {
        self.source != TimeLogSource::ActiveTask
    }
}

pub fn job_week_key(job_id: &str, week_bucket: &str) -> String {
    format!("{}|{}", job_id, week_bucket)
}

impl Document for TimeLog {
    const COLLECTION: &'static str = "time_logs";

    fn id(&self) -> &str {
        &self.id
    }

    fn index(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::new(INDEX_JOB, self.job_id.as_str()),
            IndexEntry::new(INDEX_WEEK, self.week_bucket.as_str()),
            IndexEntry::new(INDEX_JOB_WEEK, job_week_key(&self.job_id, &self.week_bucket)),
            IndexEntry::new(INDEX_PERSON, self.person_id.as_str()),
        ]
    }
}

/// Input for [`TimeLogs::create`](crate::db::time_logs::TimeLogs::create).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewTimeLog {
    pub person_id: String,
    pub job_id: String,
    pub task_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub break_ms: i64,
    pub billable: bool,
    pub note: Option<String>,
    pub source: TimeLogSource,
}

/// Fields that may change after creation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeLogUpdate {
    pub job_id: Option<String>,
    pub task_id: Option<Option<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub break_ms: Option<i64>,
    pub billable: Option<bool>,
    pub note: Option<Option<String>>,
    pub invoice_id: Option<String>,
}

impl TimeLogUpdate {
    /// Whether the update touches anything the span validation depends on.
    pub fn touches_span(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.duration_minutes.is_some() || self.break_ms.is_some()
    }

    pub fn link_invoice(invoice_id: impl Into<String>) -> Self {
        TimeLogUpdate {
            invoice_id: Some(invoice_id.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeLogFilter {
    All,
    ByJob(String),
    ByWeek(String),
    ByJobWeek(String, String),
    ByPerson(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeLogEvent {
    Created,
    Updated,
    Deleted,
}

/// Checks the fields of a log that must hold regardless of other records.
pub fn validate_span(
    person_id: &str,
    job_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration_minutes: i64,
    break_ms: i64,
) -> Result<(), TrackerError> {
    if person_id.trim().is_empty() {
        return Err(TrackerError::validation("person id is required"));
    }
    if job_id.trim().is_empty() {
        return Err(TrackerError::validation("job id is required"));
    }
    if end <= start {
        return Err(TrackerError::InvalidRange { start, end });
    }
    if duration_minutes < 1 {
        return Err(TrackerError::validation(format!(
            "duration must be at least one minute, got {}",
            duration_minutes
        )));
    }
    if break_ms < 0 {
        return Err(TrackerError::validation(format!("break time cannot be negative, got {} ms", break_ms)));
    }
    let span_ms = (end - start).num_milliseconds();
    let max_minutes = (span_ms + 59_999) / 60_000;
    if duration_minutes > max_minutes {
        return Err(TrackerError::validation(format!(
            "duration of {} min does not fit in a span of {} min",
            duration_minutes, max_minutes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, h, m, 0).unwrap()
    }

    #[test]
    fn duration_may_round_up_to_partial_minute() {
        let start = at(9, 0);
        let end = start + chrono::Duration::seconds(30);
        assert!(validate_span("me", "job", start, end, 1, 0).is_ok());
        assert_eq!(validate_span("me", "job", start, end, 2, 0).unwrap_err().code(), "VALIDATION_FAILED");
    }

    #[test]
    fn reversed_span_is_invalid_range() {
        let err = validate_span("me", "job", at(10, 0), at(9, 0), 5, 0).unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE");
    }
}
