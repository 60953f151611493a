//! Work session model.
//!
//! A session moves `Active ⇄ OnBreak → Completed`. The transition methods
//! here are pure: they check preconditions and mutate the value, leaving
//! persistence and timers to [`WorkSessionManager`](super::session_manager::WorkSessionManager).

use crate::db::db::Document;
use crate::db::store::IndexEntry;
use crate::libs::error::TrackerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Index of sessions that are not completed, keyed by person.
pub const INDEX_OPEN: &str = "open";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    OnBreak,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Active => "active",
            SessionStatus::OnBreak => "on break",
            SessionStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BreakPeriod {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
}

impl BreakPeriod {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WorkSession {
    pub id: String,
    pub person_id: String,
    pub job_id: String,
    pub task_id: Option<String>,
    pub billable: bool,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub breaks: Vec<BreakPeriod>,
    /// Milliseconds of closed breaks.
    pub break_ms: i64,
    pub total_minutes: i64,
    pub total_break_minutes: i64,
    pub net_minutes: i64,
    pub note: Option<String>,
    pub time_log_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Document for WorkSession {
    const COLLECTION: &'static str = "work_sessions";

    fn id(&self) -> &str {
        &self.id
    }

    fn index(&self) -> Vec<IndexEntry> {
        if self.is_open() {
            vec![IndexEntry::new(INDEX_OPEN, self.person_id.as_str())]
        } else {
            Vec::new()
        }
    }
}

/// Request to open a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockIn {
    pub job_id: Option<String>,
    pub task_id: Option<String>,
    pub billable: bool,
    pub note: Option<String>,
}

/// Final numbers of a session at a given clock-out instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTotals {
    pub elapsed_ms: i64,
    pub break_ms: i64,
    pub work_ms: i64,
    pub net_minutes: i64,
    pub break_minutes: i64,
    pub total_minutes: i64,
}

/// A clock-out that needs the user's explicit go-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationWarning {
    TooLong { hours: f64, max_hours: f64 },
    ZeroDuration,
}

impl fmt::Display for DurationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationWarning::TooLong { hours, max_hours } => {
                write!(f, "session lasted {:.1} h, more than the {:.1} h limit", hours, max_hours)
            }
            DurationWarning::ZeroDuration => write!(f, "session has no work time"),
        }
    }
}

pub fn round_minutes(ms: i64) -> i64 {
    (ms as f64 / 60_000.0).round() as i64
}

impl WorkSession {
    pub fn open(person_id: &str, request: ClockIn, default_job: &str, now: DateTime<Utc>) -> Self {
        WorkSession {
            id: Uuid::new_v4().to_string(),
            person_id: person_id.to_string(),
            job_id: request.job_id.unwrap_or_else(|| default_job.to_string()),
            task_id: request.task_id,
            billable: request.billable,
            clock_in: now,
            clock_out: None,
            status: SessionStatus::Active,
            breaks: Vec::new(),
            break_ms: 0,
            total_minutes: 0,
            total_break_minutes: 0,
            net_minutes: 0,
            note: request.note,
            time_log_id: None,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != SessionStatus::Completed
    }

    pub fn open_break(&self) -> Option<&BreakPeriod> {
        self.breaks.iter().find(|b| b.is_open())
    }

    pub fn start_break(&mut self, now: DateTime<Utc>) -> Result<&BreakPeriod, TrackerError> {
        if self.status != SessionStatus::Active {
            return Err(self.invalid("start a break"));
        }
        if self.open_break().is_some() {
            return Err(TrackerError::InvariantViolation(format!("session {} already has an open break", self.id)));
        }
        self.breaks.push(BreakPeriod {
            id: Uuid::new_v4().to_string(),
            start: now,
            end: None,
            duration_minutes: None,
        });
        self.status = SessionStatus::OnBreak;
        self.updated_at = now;
        Ok(&self.breaks[self.breaks.len() - 1])
    }

    /// Closes the open break and returns its length in milliseconds.
    pub fn end_break(&mut self, now: DateTime<Utc>) -> Result<i64, TrackerError> {
        if self.status != SessionStatus::OnBreak {
            return Err(self.invalid("end a break"));
        }
        let ms = self.close_open_break(now).ok_or_else(|| {
            TrackerError::InvariantViolation(format!("session {} is on break without an open break period", self.id))
        })?;
        self.status = SessionStatus::Active;
        Ok(ms)
    }

    /// Closes a dangling break, if any, folding it into `break_ms`.
    pub fn close_open_break(&mut self, now: DateTime<Utc>) -> Option<i64> {
        let period = self.breaks.iter_mut().find(|b| b.is_open())?;
        let mut ms = (now - period.start).num_milliseconds();
        if ms < 0 {
            warn!(session = %self.id, "break ended before it started, counting it as zero");
            ms = 0;
        }
        period.end = Some(now);
        period.duration_minutes = Some(round_minutes(ms));
        self.break_ms += ms;
        self.updated_at = now;
        Some(ms)
    }

    /// Break milliseconds at `now`, including a running break.
    pub fn break_ms_at(&self, now: DateTime<Utc>) -> i64 {
        let running = self
            .open_break()
            .map(|b| (now - b.start).num_milliseconds().max(0))
            .unwrap_or(0);
        self.break_ms + running
    }

    pub fn totals_at(&self, clock_out: DateTime<Utc>) -> SessionTotals {
        let elapsed_ms = (clock_out - self.clock_in).num_milliseconds();
        let break_ms = self.break_ms_at(clock_out);
        let mut work_ms = elapsed_ms - break_ms;
        if elapsed_ms < 0 || work_ms < 0 {
            warn!(session = %self.id, elapsed_ms, break_ms, "negative work time clamped to zero");
            work_ms = 0;
        }
        let net_minutes = round_minutes(work_ms);
        let break_minutes = round_minutes(break_ms.max(0));
        SessionTotals {
            elapsed_ms: elapsed_ms.max(0),
            break_ms: break_ms.max(0),
            work_ms,
            net_minutes,
            break_minutes,
            total_minutes: net_minutes + break_minutes,
        }
    }

    /// Marks the session completed with its final totals. The time log link
    /// is set separately once the log exists.
    pub fn finalize(&mut self, clock_out: DateTime<Utc>, totals: SessionTotals) {
        self.clock_out = Some(clock_out);
        self.status = SessionStatus::Completed;
        self.total_minutes = totals.total_minutes;
        self.total_break_minutes = totals.break_minutes;
        self.net_minutes = totals.net_minutes;
        self.updated_at = clock_out;
    }

    fn invalid(&self, action: &'static str) -> TrackerError {
        TrackerError::InvalidTransition {
            action,
            status: self.status.to_string(),
        }
    }
}
