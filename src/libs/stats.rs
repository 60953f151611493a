//! Incremental weekly and per-job statistics.
//!
//! The aggregator keeps a [`CachedStats`] snapshot in memory and in the
//! store. Every time log change is applied as a signed integer delta, so the
//! snapshot never needs a rescan on the hot path. A full recomputation from
//! the time logs produces the same numbers and is used on first start, on
//! request, and whenever the current week rolls over.

use crate::db::db::Db;
use crate::db::stats_cache::StatsCache;
use crate::db::time_logs::TimeLogHook;
use crate::libs::clock::SharedClock;
use crate::libs::config::JobTotalsMode;
use crate::libs::error::{Result, TrackerError};
use crate::libs::observer::{Observers, Subscription};
use crate::libs::settings::SettingsProvider;
use crate::libs::time_log::{TimeLog, TimeLogEvent, INDEX_WEEK};
use crate::libs::week::{week_bucket_key, week_range};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CachedStats {
    pub week_bucket: String,
    pub week_total_minutes: i64,
    pub target_minutes: i64,
    pub job_minutes: BTreeMap<String, i64>,
    pub job_totals: JobTotalsMode,
    pub person_id: Option<String>,
    pub last_updated: DateTime<Utc>,
    /// Work minutes of the running session, pushed by the timer tick.
    #[serde(skip)]
    pub live_minutes: i64,
}

impl CachedStats {
    /// Week total including the running session.
    pub fn displayed_week_minutes(&self) -> i64 {
        self.week_total_minutes + self.live_minutes
    }
}

/// Per-week rollup written by recomputation and backfill.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeeklyTotal {
    pub id: String,
    pub week_bucket: String,
    pub person_id: Option<String>,
    pub total_minutes: i64,
    pub job_minutes: BTreeMap<String, i64>,
    pub computed_at: DateTime<Utc>,
}

impl WeeklyTotal {
    pub fn key(person_id: Option<&str>, week_bucket: &str) -> String {
        format!("{}|{}", person_id.unwrap_or("*"), week_bucket)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillProgress {
    pub done: usize,
    pub total: usize,
    pub week: String,
}

fn summarize<'a>(logs: impl Iterator<Item = &'a TimeLog>) -> (i64, BTreeMap<String, i64>) {
    let mut total = 0;
    let mut jobs = BTreeMap::new();
    for log in logs {
        total += log.duration_minutes;
        *jobs.entry(log.job_id.clone()).or_insert(0) += log.duration_minutes;
    }
    jobs.retain(|_, minutes| *minutes != 0);
    (total, jobs)
}

pub struct StatsAggregator {
    db: Db,
    cache: StatsCache,
    settings: SettingsProvider,
    clock: SharedClock,
    mode: JobTotalsMode,
    person_id: Option<String>,
    state: Mutex<CachedStats>,
    observers: Observers<CachedStats>,
}

impl StatsAggregator {
    pub fn new(
        db: Db,
        settings: SettingsProvider,
        clock: SharedClock,
        mode: JobTotalsMode,
        person_id: Option<String>,
    ) -> Result<Self> {
        let current = settings.get();
        let now = clock.now();
        let state = CachedStats {
            week_bucket: week_bucket_key(now, current.tz()?, current.week_start),
            week_total_minutes: 0,
            target_minutes: current.target_minutes(),
            job_minutes: BTreeMap::new(),
            job_totals: mode,
            person_id: person_id.clone(),
            last_updated: now,
            live_minutes: 0,
        };
        Ok(Self {
            cache: StatsCache::new(db.clone()),
            db,
            settings,
            clock,
            mode,
            person_id,
            state: Mutex::new(state),
            observers: Observers::new(),
        })
    }

    pub fn current_bucket(&self) -> Result<String> {
        let settings = self.settings.get();
        Ok(week_bucket_key(self.clock.now(), settings.tz()?, settings.week_start))
    }

    fn in_scope(&self, log: &TimeLog) -> bool {
        self.person_id.as_ref().map_or(true, |p| *p == log.person_id)
    }

    /// Adds a signed delta to the in-memory snapshot.
    pub fn apply_delta(
        &self,
        week_bucket: &str,
        job_id: &str,
        minutes_delta: i64,
        target_minutes: i64,
        affects_current_week: bool,
    ) {
        let mut state = self.state.lock();
        state.target_minutes = target_minutes;
        if affects_current_week {
            state.week_total_minutes += minutes_delta;
        }
        if self.mode == JobTotalsMode::AllTime || affects_current_week {
            let entry = state.job_minutes.entry(job_id.to_string()).or_insert(0);
            *entry += minutes_delta;
            if *entry == 0 {
                state.job_minutes.remove(job_id);
            }
        }
        state.last_updated = self.clock.now();
        debug!(week = week_bucket, job = job_id, minutes_delta, affects_current_week, "stats delta applied");
    }

    /// Reverses `old` and applies `new`, then persists the snapshot.
    pub async fn on_time_log_changed(&self, event: TimeLogEvent, new: Option<&TimeLog>, old: Option<&TimeLog>) -> Result<()> {
        let current = self.current_bucket()?;
        let target = self.settings.get().target_minutes();

        let reverse = match event {
            TimeLogEvent::Created => None,
            TimeLogEvent::Updated | TimeLogEvent::Deleted => old,
        };
        let apply = match event {
            TimeLogEvent::Created | TimeLogEvent::Updated => new,
            TimeLogEvent::Deleted => None,
        };
        if let Some(old) = reverse.filter(|log| self.in_scope(log)) {
            self.apply_delta(&old.week_bucket, &old.job_id, -old.duration_minutes, target, old.week_bucket == current);
        }
        if let Some(new) = apply.filter(|log| self.in_scope(log) && !log.is_deleted()) {
            self.apply_delta(&new.week_bucket, &new.job_id, new.duration_minutes, target, new.week_bucket == current);
        }

        let rolled_over = self.state.lock().week_bucket != current;
        if rolled_over {
            self.state.lock().week_bucket = current.clone();
            self.recompute_week_aggregates(None, &current).await?;
            return Ok(());
        }
        self.persist().await
    }

    /// Authoritative totals of one week from the week index.
    ///
    /// Writes a [`WeeklyTotal`] rollup. When `week_bucket` is the current
    /// week, the cached week total is replaced as well (and the per-job map
    /// in current-week mode).
    pub async fn recompute_week_aggregates(&self, person_id: Option<&str>, week_bucket: &str) -> Result<WeeklyTotal> {
        let person = person_id.or(self.person_id.as_deref());
        let logs: Vec<TimeLog> = self.db.query(INDEX_WEEK, week_bucket).await?;
        let (total, jobs) = summarize(
            logs.iter()
                .filter(|log| !log.is_deleted() && person.map_or(true, |p| p == log.person_id)),
        );
        let now = self.clock.now();
        let weekly = WeeklyTotal {
            id: WeeklyTotal::key(person, week_bucket),
            week_bucket: week_bucket.to_string(),
            person_id: person.map(str::to_string),
            total_minutes: total,
            job_minutes: jobs.clone(),
            computed_at: now,
        };
        self.cache.save_weekly(&weekly).await?;

        if week_bucket == self.current_bucket()? && person == self.person_id.as_deref() {
            {
                let mut state = self.state.lock();
                state.week_bucket = week_bucket.to_string();
                state.week_total_minutes = total;
                state.target_minutes = self.settings.get().target_minutes();
                if self.mode == JobTotalsMode::CurrentWeek {
                    state.job_minutes = jobs;
                }
                state.last_updated = now;
            }
            self.persist().await?;
        }
        debug!(week = week_bucket, total, "week recomputed");
        Ok(weekly)
    }

    pub async fn recompute_current_week(&self) -> Result<WeeklyTotal> {
        let current = self.current_bucket()?;
        self.recompute_week_aggregates(None, &current).await
    }

    /// Rebuilds the whole snapshot from every time log.
    pub async fn recompute_all(&self) -> Result<CachedStats> {
        let current = self.current_bucket()?;
        let logs: Vec<TimeLog> = self.db.scan().await?;
        let live: Vec<&TimeLog> = logs.iter().filter(|log| !log.is_deleted() && self.in_scope(log)).collect();
        let (week_total, week_jobs) = summarize(live.iter().copied().filter(|log| log.week_bucket == current));
        let job_minutes = match self.mode {
            JobTotalsMode::AllTime => summarize(live.iter().copied()).1,
            JobTotalsMode::CurrentWeek => week_jobs.clone(),
        };
        let now = self.clock.now();

        self.cache
            .save_weekly(&WeeklyTotal {
                id: WeeklyTotal::key(self.person_id.as_deref(), &current),
                week_bucket: current.clone(),
                person_id: self.person_id.clone(),
                total_minutes: week_total,
                job_minutes: week_jobs,
                computed_at: now,
            })
            .await?;

        {
            let mut state = self.state.lock();
            state.week_bucket = current;
            state.week_total_minutes = week_total;
            state.target_minutes = self.settings.get().target_minutes();
            state.job_minutes = job_minutes;
            state.job_totals = self.mode;
            state.person_id = self.person_id.clone();
            state.last_updated = now;
        }
        info!("stats recomputed from {} time log(s)", live.len());
        self.persist().await?;
        Ok(self.snapshot())
    }

    /// Recomputes the last `weeks_back` weeks, newest first.
    pub async fn backfill_weekly_totals<F>(&self, weeks_back: usize, mut on_progress: F) -> Result<Vec<WeeklyTotal>>
    where
        F: FnMut(&BackfillProgress),
    {
        let settings = self.settings.get();
        let tz = settings.tz()?;
        let mut range = week_range(self.clock.now(), tz, settings.week_start);
        let mut totals = Vec::with_capacity(weeks_back);
        for done in 1..=weeks_back {
            let week = week_bucket_key(range.start, tz, settings.week_start);
            totals.push(self.recompute_week_aggregates(None, &week).await?);
            on_progress(&BackfillProgress {
                done,
                total: weeks_back,
                week,
            });
            range = range.previous(tz, settings.week_start);
        }
        Ok(totals)
    }

    /// Loads the persisted snapshot, or rebuilds it when missing, stale in
    /// shape, or `force` is set. Errors are returned to the caller.
    pub async fn initialize(&self, force: bool) -> Result<CachedStats> {
        if !force {
            if let Some(cached) = self.cache.load().await? {
                if cached.job_totals == self.mode && cached.person_id == self.person_id {
                    let stale = cached.week_bucket != self.current_bucket()?;
                    {
                        let mut state = self.state.lock();
                        let live = state.live_minutes;
                        *state = cached;
                        state.live_minutes = live;
                        state.target_minutes = self.settings.get().target_minutes();
                    }
                    if stale {
                        self.recompute_current_week().await?;
                    } else {
                        self.publish();
                    }
                    return Ok(self.snapshot());
                }
            }
        }
        self.recompute_all().await
    }

    /// Picks up new settings: target, and the week label with its total.
    pub async fn refresh_settings(&self) -> Result<()> {
        let current = self.current_bucket()?;
        let label_changed = {
            let mut state = self.state.lock();
            state.target_minutes = self.settings.get().target_minutes();
            state.week_bucket != current
        };
        if label_changed {
            self.recompute_week_aggregates(None, &current).await?;
        } else {
            self.persist().await?;
        }
        Ok(())
    }

    /// Runs [`refresh_settings`](Self::refresh_settings) on every settings change.
    pub fn watch_settings(self: &Arc<Self>) -> Subscription {
        let aggregator = Arc::downgrade(self);
        self.settings.subscribe(move |_| {
            let Some(aggregator) = aggregator.upgrade() else {
                return;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = aggregator.refresh_settings().await {
                            warn!("stats refresh after settings change failed: {}", e);
                        }
                    });
                }
                Err(_) => warn!("settings changed outside a runtime, stats not refreshed"),
            }
        })
    }

    pub fn set_live_minutes(&self, minutes: i64) {
        {
            let mut state = self.state.lock();
            if state.live_minutes == minutes {
                return;
            }
            state.live_minutes = minutes;
        }
        self.publish();
    }

    pub fn snapshot(&self) -> CachedStats {
        self.state.lock().clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CachedStats) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    async fn persist(&self) -> Result<()> {
        let snapshot = self.snapshot();
        self.cache.save(&snapshot).await.map_err(TrackerError::from)?;
        self.observers.publish(&snapshot);
        Ok(())
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.observers.publish(&snapshot);
    }
}

#[async_trait]
impl TimeLogHook for StatsAggregator {
    async fn on_time_log_changed(&self, event: TimeLogEvent, new: Option<&TimeLog>, old: Option<&TimeLog>) -> Result<()> {
        StatsAggregator::on_time_log_changed(self, event, new, old).await
    }
}
