//! Owner of the open work session.
//!
//! [`WorkSessionManager`] drives a [`WorkSession`] through clock-in, breaks
//! and clock-out, persisting each step, and keeps two timer anchors for the
//! live display:
//!
//! - the wall clock, which is what gets stored and what clock-out totals are
//!   computed from;
//! - a monotonic high-resolution reading taken at clock-in (and at break
//!   start), used by the once-per-tick elapsed computation.
//!
//! After a restart the anchors are rebuilt from the persisted wall-clock
//! times as `anchor = now_high_res - (now_wall - persisted_wall)`, so the
//! display resumes where it was instead of from zero.
//!
//! When the final write at clock-out fails, the session stays open and
//! visible and the manager holds a pending write until the caller picks a
//! [`RecoveryAction`].

use crate::db::db::Db;
use crate::db::store::StoreError;
use crate::db::time_logs::TimeLogs;
use crate::db::work_sessions::WorkSessions;
use crate::libs::clock::SharedClock;
use crate::libs::config::TrackerConfig;
use crate::libs::error::{RecoveryAction, Result, TrackerError};
use crate::libs::messages::Message;
use crate::libs::notify::{Level, SharedNotifier};
use crate::libs::observer::{Observers, Subscription};
use crate::libs::outbox::{PendingWrite, SharedQueue};
use crate::libs::session::{round_minutes, ClockIn, DurationWarning, SessionTotals, WorkSession};
use crate::libs::settings::SettingsProvider;
use crate::libs::stats::StatsAggregator;
use crate::libs::ticker::Ticker;
use crate::libs::time_log::{NewTimeLog, TimeLog, TimeLogSource};
use crate::libs::week::{validate_session_duration, week_bucket_key};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const QUEUE_ENTITY: &str = "work_session";
const QUEUE_OPERATION: &str = "clock_out";

/// Asked before a suspicious session is recorded.
pub trait Confirm {
    fn confirm(&self, warning: &DurationWarning) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&DurationWarning) -> bool,
{
    fn confirm(&self, warning: &DurationWarning) -> bool {
        self(warning)
    }
}

/// Live view of the timer, published on every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub session: Option<WorkSession>,
    pub elapsed_ms: i64,
    pub work_ms: i64,
    pub break_ms: i64,
    pub live_work_minutes: i64,
    pub pending_write: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSession {
    pub session: WorkSession,
    pub time_log: TimeLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClockOutOutcome {
    Completed(ClosedSession),
    /// The final write failed; the session is still open.
    PendingWrite { error: String, actions: Vec<RecoveryAction> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Completed(ClosedSession),
    StillPending { error: String, actions: Vec<RecoveryAction> },
    SavedLocally,
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    pub replayed: usize,
    pub failed: Vec<(String, String)>,
}

/// Everything needed to finish a clock-out later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PendingClockOut {
    completed: WorkSession,
    new_log: NewTimeLog,
    /// Set once the time log landed, so a retry only rewrites the session.
    time_log: Option<TimeLog>,
}

#[derive(Debug, Clone, Copy)]
struct Anchors {
    clock_in_ms: i64,
    break_ms: Option<i64>,
}

#[derive(Default)]
struct TimerState {
    session: Option<WorkSession>,
    anchors: Option<Anchors>,
    pending: Option<PendingClockOut>,
}

/// Shared between the manager and its tick task.
#[derive(Clone)]
struct LiveView {
    state: Arc<Mutex<TimerState>>,
    clock: SharedClock,
    settings: SettingsProvider,
    stats: Option<Arc<StatsAggregator>>,
    observers: Arc<Observers<TimerSnapshot>>,
}

impl LiveView {
    fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.lock();
        let pending_write = state.pending.is_some();
        match (&state.session, state.anchors) {
            (Some(session), Some(anchors)) => {
                let now = self.clock.high_res_ms();
                let elapsed_ms = (now - anchors.clock_in_ms).max(0);
                let running_break = anchors.break_ms.map(|b| (now - b).max(0)).unwrap_or(0);
                let break_ms = session.break_ms + running_break;
                let work_ms = (elapsed_ms - break_ms).max(0);
                TimerSnapshot {
                    session: Some(session.clone()),
                    elapsed_ms,
                    work_ms,
                    break_ms,
                    live_work_minutes: round_minutes(work_ms),
                    pending_write,
                }
            }
            _ => TimerSnapshot {
                session: None,
                elapsed_ms: 0,
                work_ms: 0,
                break_ms: 0,
                live_work_minutes: 0,
                pending_write,
            },
        }
    }

    fn tick(&self) {
        let snapshot = self.snapshot();
        if let Some(stats) = &self.stats {
            stats.set_live_minutes(self.live_minutes_this_week(&snapshot));
        }
        self.observers.publish(&snapshot);
    }

    fn live_minutes_this_week(&self, snapshot: &TimerSnapshot) -> i64 {
        let Some(session) = &snapshot.session else {
            return 0;
        };
        let settings = self.settings.get();
        let Ok(tz) = settings.tz() else {
            return 0;
        };
        let started = week_bucket_key(session.clock_in, tz, settings.week_start);
        let current = week_bucket_key(self.clock.now(), tz, settings.week_start);
        if started == current {
            snapshot.live_work_minutes
        } else {
            0
        }
    }
}

pub struct WorkSessionManager {
    sessions: WorkSessions,
    time_logs: TimeLogs,
    queue: SharedQueue,
    notifier: SharedNotifier,
    clock: SharedClock,
    config: TrackerConfig,
    live: LiveView,
    ticker: Ticker,
}

impl WorkSessionManager {
    pub fn new(
        db: Db,
        time_logs: TimeLogs,
        settings: SettingsProvider,
        clock: SharedClock,
        config: TrackerConfig,
        queue: SharedQueue,
        notifier: SharedNotifier,
    ) -> Self {
        let live = LiveView {
            state: Arc::new(Mutex::new(TimerState::default())),
            clock: clock.clone(),
            settings,
            stats: None,
            observers: Arc::new(Observers::new()),
        };
        Self {
            sessions: WorkSessions::new(db),
            time_logs,
            queue,
            notifier,
            clock,
            ticker: Ticker::new(Duration::from_millis(config.tick_interval_ms.max(1))),
            config,
            live,
        }
    }

    pub fn with_stats(mut self, stats: Arc<StatsAggregator>) -> Self {
        self.live.stats = Some(stats);
        self
    }

    pub fn current_session(&self) -> Option<WorkSession> {
        self.live.state.lock().session.clone()
    }

    pub fn has_pending_write(&self) -> bool {
        self.live.state.lock().pending.is_some()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.live.snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerSnapshot) + Send + Sync + 'static,
    {
        self.live.observers.subscribe(listener)
    }

    /// Stops the live tick. The session itself is unaffected.
    pub fn shutdown(&self) {
        self.ticker.cancel();
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    pub async fn clock_in(&self, request: ClockIn) -> Result<WorkSession> {
        if let Some(open) = self.current_session() {
            self.notifier
                .notify(Level::Warning, Message::SessionAlreadyOpen(open.clock_in.to_rfc3339()));
            return Err(TrackerError::InvalidTransition {
                action: "clock in",
                status: open.status.to_string(),
            });
        }
        if let Some(open) = self.stored_open_session().await? {
            self.notifier
                .notify(Level::Warning, Message::SessionAlreadyOpen(open.clock_in.to_rfc3339()));
            return Err(TrackerError::InvalidTransition {
                action: "clock in",
                status: open.status.to_string(),
            });
        }

        let now = self.clock.now();
        let high_res = self.clock.high_res_ms();
        let session = WorkSession::open(&self.config.person_id, request, &self.config.default_job_id, now);
        {
            let mut state = self.live.state.lock();
            state.session = Some(session.clone());
            state.anchors = Some(Anchors {
                clock_in_ms: high_res,
                break_ms: None,
            });
        }

        if let Err(e) = self.sessions.put(&session).await {
            error!(session = %session.id, "clock-in write failed: {}", e);
            *self.live.state.lock() = TimerState::default();
            return Err(e.into());
        }

        debug!(session = %session.id, job = %session.job_id, "clocked in");
        self.start_ticker();
        self.notifier
            .notify(Level::Success, Message::ClockedIn(session.clock_in.to_rfc3339()));
        self.live.tick();
        Ok(session)
    }

    pub async fn start_break(&self) -> Result<WorkSession> {
        let mut session = self.require_session("start a break")?;
        let now = self.clock.now();
        if session.open_break().is_some() {
            self.notifier.notify(Level::Warning, Message::BreakAlreadyOpen);
        }
        session.start_break(now)?;
        self.sessions.put(&session).await?;

        let high_res = self.clock.high_res_ms();
        {
            let mut state = self.live.state.lock();
            state.session = Some(session.clone());
            if let Some(anchors) = state.anchors.as_mut() {
                anchors.break_ms = Some(high_res);
            }
        }
        debug!(session = %session.id, "break started");
        self.notifier.notify(Level::Info, Message::BreakStarted(now.to_rfc3339()));
        self.live.tick();
        Ok(session)
    }

    /// Ends the open break and returns its length in milliseconds.
    pub async fn end_break(&self) -> Result<i64> {
        let mut session = self.require_session("end a break")?;
        let now = self.clock.now();
        let break_ms = match session.end_break(now) {
            Ok(ms) => ms,
            Err(e) => {
                self.notifier.notify(Level::Warning, Message::NotOnBreak);
                return Err(e);
            }
        };
        self.sessions.put(&session).await?;

        {
            let mut state = self.live.state.lock();
            state.session = Some(session.clone());
            if let Some(anchors) = state.anchors.as_mut() {
                anchors.break_ms = None;
            }
        }
        debug!(session = %session.id, break_ms, "break ended");
        self.notifier
            .notify(Level::Info, Message::BreakEnded(round_minutes(break_ms)));
        self.live.tick();
        Ok(break_ms)
    }

    /// Closes the session and records its time log.
    ///
    /// Declining a [`DurationWarning`] returns [`TrackerError::Unconfirmed`]
    /// and leaves the session exactly as it was.
    pub async fn clock_out(&self, confirm: &dyn Confirm) -> Result<ClockOutOutcome> {
        let session = self.require_session("clock out")?;
        let now = self.clock.now();
        if now <= session.clock_in {
            self.notifier.notify(Level::Error, Message::ClockOutBeforeClockIn);
            return Err(TrackerError::ClockDrift {
                clock_in: session.clock_in,
                clock_out: now,
            });
        }

        let mut closing = session.clone();
        closing.close_open_break(now);
        let totals = closing.totals_at(now);

        for warning in self.duration_warnings(&session, now, &totals) {
            if !confirm.confirm(&warning) {
                self.notifier.notify(Level::Info, Message::ClockOutDeclined);
                return Err(TrackerError::Unconfirmed(warning));
            }
        }

        let new_log = NewTimeLog {
            person_id: closing.person_id.clone(),
            job_id: closing.job_id.clone(),
            task_id: closing.task_id.clone(),
            start: closing.clock_in,
            end: now,
            duration_minutes: totals.net_minutes.max(1),
            break_ms: totals.break_ms,
            billable: closing.billable,
            note: closing.note.clone(),
            source: TimeLogSource::Session,
        };
        let mut completed = closing;
        completed.finalize(now, totals);

        let mut pending = PendingClockOut {
            completed,
            new_log,
            time_log: None,
        };
        match self.write_completion(&mut pending).await {
            Ok(closed) => {
                self.finish(&closed).await;
                Ok(ClockOutOutcome::Completed(closed))
            }
            Err(e) if e.is_persistence() => {
                let error = self.park(pending, e);
                Ok(ClockOutOutcome::PendingWrite {
                    error,
                    actions: RecoveryAction::ALL.to_vec(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Applies the user's choice to a pending clock-out.
    pub async fn resolve_pending(&self, action: RecoveryAction) -> Result<Resolution> {
        let mut pending = self
            .live
            .state
            .lock()
            .pending
            .take()
            .ok_or_else(|| TrackerError::not_found("pending write", &self.config.person_id))?;

        match action {
            RecoveryAction::Retry => match self.write_completion(&mut pending).await {
                Ok(closed) => {
                    self.finish(&closed).await;
                    Ok(Resolution::Completed(closed))
                }
                Err(e) if e.is_persistence() => {
                    let error = self.park(pending, e);
                    Ok(Resolution::StillPending {
                        error,
                        actions: RecoveryAction::ALL.to_vec(),
                    })
                }
                Err(e) => Err(e),
            },
            RecoveryAction::SaveLocally => {
                let payload = serde_json::to_value(&pending).map_err(StoreError::from)?;
                let write = PendingWrite::new(QUEUE_ENTITY, QUEUE_OPERATION, payload, self.clock.now());
                if let Err(e) = self.queue.enqueue(write) {
                    error!("offline queue rejected the clock-out: {}", e);
                    self.live.state.lock().pending = Some(pending);
                    return Err(e.into());
                }
                self.release_timer();
                info!(session = %pending.completed.id, "clock-out saved to the offline queue");
                self.notifier.notify(Level::Warning, Message::SessionSavedLocally);
                self.live.tick();
                Ok(Resolution::SavedLocally)
            }
            RecoveryAction::Discard => {
                let log_id = pending.time_log.as_ref().map(|log| log.id.clone());
                if let Some(log_id) = log_id {
                    if let Err(e) = self.time_logs.soft_delete(&log_id).await {
                        warn!(time_log = %log_id, "could not withdraw time log of discarded clock-out: {}", e);
                        let error = self.park(pending, e);
                        return Ok(Resolution::StillPending {
                            error,
                            actions: RecoveryAction::ALL.to_vec(),
                        });
                    }
                }
                self.notifier.notify(Level::Info, Message::SessionClockOutDiscarded);
                self.live.tick();
                Ok(Resolution::Discarded)
            }
        }
    }

    /// Replays clock-outs saved to the offline queue.
    pub async fn flush_offline_queue(&self) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        for write in self.queue.pending()? {
            if write.entity != QUEUE_ENTITY || write.operation != QUEUE_OPERATION {
                warn!(entity = %write.entity, operation = %write.operation, "unknown queued write left in place");
                report.failed.push((write.id, "unknown operation".to_string()));
                continue;
            }
            let mut pending: PendingClockOut = match serde_json::from_value(write.payload.clone()) {
                Ok(pending) => pending,
                Err(e) => {
                    report.failed.push((write.id, e.to_string()));
                    continue;
                }
            };
            let had_log = pending.time_log.is_some();
            match self.write_completion(&mut pending).await {
                Ok(closed) => {
                    self.queue.remove(&write.id)?;
                    self.refresh_week(&closed.time_log).await;
                    report.replayed += 1;
                }
                Err(e) => {
                    warn!(id = %write.id, "queued clock-out not replayed: {}", e);
                    if !had_log && pending.time_log.is_some() {
                        // keep the created log so the next attempt does not duplicate it
                        let mut updated = PendingWrite::new(
                            QUEUE_ENTITY,
                            QUEUE_OPERATION,
                            serde_json::to_value(&pending).map_err(StoreError::from)?,
                            write.queued_at,
                        );
                        updated.attempts = write.attempts + 1;
                        self.queue.remove(&write.id)?;
                        self.queue.enqueue(updated)?;
                    } else {
                        self.queue.record_attempt(&write.id)?;
                    }
                    report.failed.push((write.id, e.to_string()));
                }
            }
        }
        if report.replayed > 0 {
            self.notifier
                .notify(Level::Success, Message::PendingWritesFlushed(report.replayed));
        }
        for (_, error) in &report.failed {
            self.notifier
                .notify(Level::Error, Message::PendingWriteFailed(error.clone()));
        }
        Ok(report)
    }

    /// Reloads an open session from the store and rebuilds the timer anchors.
    pub async fn recover(&self) -> Result<Option<WorkSession>> {
        if let Some(session) = self.current_session() {
            return Ok(Some(session));
        }
        let Some(session) = self.stored_open_session().await? else {
            return Ok(None);
        };

        let now_wall = self.clock.now();
        let now_high_res = self.clock.high_res_ms();
        let anchor_for = |wall: DateTime<Utc>| now_high_res - (now_wall - wall).num_milliseconds();
        let anchors = Anchors {
            clock_in_ms: anchor_for(session.clock_in),
            break_ms: session.open_break().map(|b| anchor_for(b.start)),
        };
        {
            let mut state = self.live.state.lock();
            state.session = Some(session.clone());
            state.anchors = Some(anchors);
        }
        debug!(session = %session.id, "session recovered");
        self.start_ticker();
        self.notifier
            .notify(Level::Info, Message::SessionRecovered(session.clock_in.to_rfc3339()));
        self.live.tick();
        Ok(Some(session))
    }

    fn require_session(&self, action: &'static str) -> Result<WorkSession> {
        let state = self.live.state.lock();
        if state.pending.is_some() {
            return Err(TrackerError::InvalidTransition {
                action,
                status: "waiting for a pending write".to_string(),
            });
        }
        match &state.session {
            Some(session) => Ok(session.clone()),
            None => {
                self.notifier.notify(Level::Warning, Message::NoOpenSession);
                Err(TrackerError::not_found("open work session", &self.config.person_id))
            }
        }
    }

    /// Latest open session in the store that is not already queued for clock-out.
    async fn stored_open_session(&self) -> Result<Option<WorkSession>> {
        let queued: Vec<String> = self
            .queue
            .pending()?
            .into_iter()
            .filter(|w| w.entity == QUEUE_ENTITY && w.operation == QUEUE_OPERATION)
            .filter_map(|w| serde_json::from_value::<PendingClockOut>(w.payload).ok())
            .map(|p| p.completed.id)
            .collect();
        let open: Vec<WorkSession> = self
            .sessions
            .open_for(&self.config.person_id)
            .await?
            .into_iter()
            .filter(|s| !queued.contains(&s.id))
            .collect();
        if open.len() > 1 {
            warn!(count = open.len(), "several open sessions found, using the latest clock-in");
        }
        Ok(open.into_iter().next())
    }

    fn duration_warnings(&self, session: &WorkSession, now: DateTime<Utc>, totals: &SessionTotals) -> Vec<DurationWarning> {
        let mut warnings = Vec::new();
        let check = validate_session_duration(session.clock_in, now, self.config.max_session_hours);
        if !check.valid {
            warnings.push(DurationWarning::TooLong {
                hours: check.hours,
                max_hours: self.config.max_session_hours,
            });
        }
        if totals.net_minutes == 0 {
            warnings.push(DurationWarning::ZeroDuration);
        }
        warnings
    }

    async fn write_completion(&self, pending: &mut PendingClockOut) -> Result<ClosedSession> {
        let time_log = match &pending.time_log {
            Some(log) => log.clone(),
            None => {
                let log = self.time_logs.create(pending.new_log.clone()).await?;
                pending.time_log = Some(log.clone());
                log
            }
        };
        let mut session = pending.completed.clone();
        session.time_log_id = Some(time_log.id.clone());
        self.sessions.put(&session).await?;
        Ok(ClosedSession { session, time_log })
    }

    /// Holds a failed clock-out; the session stays open and ticking.
    fn park(&self, pending: PendingClockOut, e: TrackerError) -> String {
        error!(session = %pending.completed.id, "clock-out write failed: {}", e);
        self.live.state.lock().pending = Some(pending);
        let error = e.to_string();
        self.notifier
            .notify(Level::Error, Message::SessionWritePending(error.clone()));
        self.live.tick();
        error
    }

    async fn finish(&self, closed: &ClosedSession) {
        self.release_timer();
        debug!(session = %closed.session.id, minutes = closed.session.net_minutes, "clocked out");
        self.refresh_week(&closed.time_log).await;
        self.notifier.notify(
            Level::Success,
            Message::ClockedOut {
                net_minutes: closed.session.net_minutes,
                break_minutes: closed.session.total_break_minutes,
            },
        );
        self.live.tick();
    }

    fn release_timer(&self) {
        self.ticker.cancel();
        *self.live.state.lock() = TimerState::default();
        if let Some(stats) = &self.live.stats {
            stats.set_live_minutes(0);
        }
    }

    /// Recomputes the log's week. Failures leave the cache stale and are only logged.
    async fn refresh_week(&self, log: &TimeLog) {
        let Some(stats) = &self.live.stats else {
            return;
        };
        if let Err(e) = stats.recompute_week_aggregates(None, &log.week_bucket).await {
            warn!(week = %log.week_bucket, "stats recompute after clock-out failed: {}", e);
        }
    }

    fn start_ticker(&self) {
        let live = self.live.clone();
        self.ticker.start(move || live.tick());
    }
}
