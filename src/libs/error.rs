//! Error taxonomy of the tracking core.
//!
//! Validation and invariant errors are raised before anything is written.
//! Storage failures carry the underlying [`StoreError`]; whether they are
//! surfaced or only logged depends on whether the write was a primary record
//! or a derived cache, which is decided by the caller.

use crate::db::store::StoreError;
use crate::libs::session::DurationWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("time span overlaps time log {conflicting_id} of person {person_id}")]
    Overlap { person_id: String, conflicting_id: String },

    #[error("end {end} is not after start {start}")]
    InvalidRange { start: DateTime<Utc>, end: DateTime<Utc> },

    #[error("clock-out at {clock_out} is not after clock-in at {clock_in}")]
    ClockDrift { clock_in: DateTime<Utc>, clock_out: DateTime<Utc> },

    #[error("not confirmed: {0}")]
    Unconfirmed(DurationWarning),

    #[error("storage failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("cannot {action} while {status}")]
    InvalidTransition { action: &'static str, status: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("background worker failed: {0}")]
    Worker(String),
}

impl TrackerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Validation(_) => "VALIDATION_FAILED",
            TrackerError::Overlap { .. } => "OVERLAP",
            TrackerError::InvalidRange { .. } => "INVALID_RANGE",
            TrackerError::ClockDrift { .. } => "CLOCK_DRIFT",
            TrackerError::Unconfirmed(_) => "DURATION_UNCONFIRMED",
            TrackerError::Persistence(_) => "PERSISTENCE_FAILURE",
            TrackerError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            TrackerError::InvalidTransition { .. } => "INVALID_TRANSITION",
            TrackerError::NotFound { .. } => "NOT_FOUND",
            TrackerError::Settings(_) => "SETTINGS",
            TrackerError::Worker(_) => "WORKER_FAILED",
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, TrackerError::Persistence(_))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        TrackerError::NotFound { entity, id: id.into() }
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// What the user may do after a primary write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Try the same write again.
    Retry,
    /// Park the write on the offline queue and release the timer.
    SaveLocally,
    /// Abandon the operation; the session stays open.
    Discard,
}

impl RecoveryAction {
    pub const ALL: [RecoveryAction; 3] = [RecoveryAction::Retry, RecoveryAction::SaveLocally, RecoveryAction::Discard];

    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::Retry => "Retry",
            RecoveryAction::SaveLocally => "Save locally",
            RecoveryAction::Discard => "Discard",
        }
    }
}
