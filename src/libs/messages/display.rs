//! Display implementation for punchclock application messages.
//!
//! All user-facing text is defined here, in one match, so wording stays
//! consistent between console output and notifier messages.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === WORK SESSION MESSAGES ===
            Message::ClockedIn(time) => format!("Clocked in at {}", time),
            Message::SessionAlreadyOpen(time) => format!("A work session is already open since {}", time),
            Message::NoOpenSession => "No open work session. Clock in first.".to_string(),
            Message::BreakStarted(time) => format!("Break started at {}", time),
            Message::BreakEnded(minutes) => format!("Break ended after {} min", minutes),
            Message::BreakAlreadyOpen => "A break is already in progress".to_string(),
            Message::NotOnBreak => "The session is not on a break".to_string(),
            Message::ClockedOut { net_minutes, break_minutes } => {
                format!("Clocked out: {} min worked, {} min on break", net_minutes, break_minutes)
            }
            Message::ClockOutBeforeClockIn => "Clock-out time must be after clock-in. Check the system clock.".to_string(),
            Message::ConfirmLongSession(hours) => format!("Session is {:.1} hours long. Record it anyway?", hours),
            Message::ConfirmZeroSession => "Session rounds to zero minutes. Record it anyway?".to_string(),
            Message::ClockOutDeclined => "Clock-out cancelled, the session is still running".to_string(),
            Message::SessionRecovered(time) => format!("Resumed the open session started at {}", time),
            Message::SessionWritePending(error) => format!("Could not save the session ({}). Retry, save locally or discard.", error),
            Message::SessionSavedLocally => "Session saved to the offline queue. Run `punchclock sync` to upload it.".to_string(),
            Message::SessionClockOutDiscarded => "Clock-out discarded, the session is still running".to_string(),
            Message::PendingWritesFlushed(count) => format!("Replayed {} queued write(s)", count),
            Message::PendingWriteFailed(error) => format!("Queued write could not be replayed: {}", error),
            Message::NoPendingWrites => "Offline queue is empty".to_string(),
            Message::SessionStatusHeader => "Current session:".to_string(),
            Message::SelectRecoveryAction => "What should happen to this clock-out?".to_string(),
            Message::WatchStopped => "Stopped watching, the session keeps running".to_string(),
            Message::LiveElapsed { work, breaks } => format!("Worked {} | Break {}", work, breaks),

            // === ACTIVE TASK MESSAGES ===
            Message::TaskStarted(name) => format!("Task '{}' started", name),
            Message::TaskPaused(name) => format!("Task '{}' paused", name),
            Message::TaskResumed(name) => format!("Task '{}' resumed", name),
            Message::TaskCompleted(name, minutes) => format!("Task '{}' completed: {} min logged", name, minutes),
            Message::TaskDeleted(name) => format!("Task '{}' discarded", name),
            Message::TaskLimitReached(max) => format!("Only {} tasks can be tracked at the same time", max),
            Message::TaskNameEmpty => "Task name cannot be empty".to_string(),
            Message::TasksStillRunning(names) => format!("Still running: {}", names.join(", ")),
            Message::ConfirmDeleteTask(name) => format!("Discard task '{}' without logging its time?", name),
            Message::NoActiveTasks => "No active tasks".to_string(),
            Message::ActiveTasksHeader => "Active tasks:".to_string(),
            Message::SelectTask => "Select a task".to_string(),
            Message::PromptTaskName => "Task name".to_string(),

            // === TIME LOG MESSAGES ===
            Message::TimeLogCreated(minutes) => format!("Logged {} min", minutes),
            Message::TimeLogDeleted(id) => format!("Time log {} deleted", id),
            Message::TimeLogInvoiced(id, invoice) => format!("Time log {} linked to invoice {}", id, invoice),
            Message::TimeLogsHeader(week) => format!("Time logs for the week of {}:", week),
            Message::NoTimeLogs => "No time logs found".to_string(),
            Message::ConfirmDeleteTimeLog(id) => format!("Delete time log {}?", id),

            // === STATS MESSAGES ===
            Message::StatsHeader(week) => format!("Week of {}", week),
            Message::WeekTotal { total, target } => format!("Total {} of {} target", total, target),
            Message::StatsRecomputed(week) => format!("Totals recomputed for the week of {}", week),
            Message::BackfillProgress { done, total, week } => format!("[{}/{}] week of {}", done, total, week),
            Message::BackfillCompleted(count) => format!("Backfilled {} week(s)", count),
            Message::WeeklyHistoryHeader => "Weekly totals:".to_string(),
            Message::NoWeeklyTotals => "No weekly totals yet. Run `punchclock stats --backfill 8`.".to_string(),

            // === REPORT AND EXPORT MESSAGES ===
            Message::ReportHeader => "Report".to_string(),
            Message::ExportStarted(name) => format!("Exporting {}...", name),
            Message::ExportCompleted(path) => format!("Export completed: {}", path),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved".to_string(),
            Message::ConfigDeleted => "Configuration removed, defaults apply".to_string(),
            Message::ConfigModuleSettings => "Week settings".to_string(),
            Message::ConfigModuleTracker => "Tracker settings".to_string(),
            Message::InvalidTimezone(tz) => format!("Unknown time zone '{}'", tz),

            // === PROMPTS ===
            Message::PromptTimezone => "Time zone (IANA name)".to_string(),
            Message::PromptWeekStart => "First day of the week".to_string(),
            Message::PromptWeeklyTarget => "Weekly target hours".to_string(),
            Message::PromptPersonId => "Person id".to_string(),
            Message::PromptDefaultJob => "Default job id".to_string(),
            Message::PromptMaxSessionHours => "Maximum plausible session length (hours)".to_string(),
            Message::PromptSelectModules => "Select modules to configure".to_string(),

            // === GENERAL MESSAGES ===
            Message::OperationCancelled => "Operation cancelled".to_string(),
            Message::AmbiguousId(prefix) => format!("'{}' matches more than one record, use a longer id", prefix),
            Message::NoMatchingId(prefix) => format!("Nothing matches '{}'", prefix),
        };
        write!(f, "{}", text)
    }
}
