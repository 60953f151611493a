//! Week bucketing.
//!
//! A week bucket key is the local calendar date of the first day of the week
//! that contains a timestamp, e.g. `2025-01-06`. Keys sort chronologically as
//! plain strings and are independent of the time of day. Week boundaries are
//! computed from local dates and then converted to UTC, so a week that
//! crosses a DST change is 167 or 169 hours long rather than drifting.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Default sanity threshold for a single session.
pub const DEFAULT_MAX_SESSION_HOURS: f64 = 14.0;

const WEEK_KEY_FORMAT: &str = "%Y-%m-%d";

/// Half-open interval `[start, end)` covering one local week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekRange {
    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339()
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        is_within_range(ts, self.start, self.end)
    }

    /// The week immediately before this one, under the same settings.
    pub fn previous(&self, tz: Tz, week_start: Weekday) -> WeekRange {
        week_range(self.start - Duration::hours(12), tz, week_start)
    }
}

/// Outcome of [`validate_session_duration`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionDurationCheck {
    pub valid: bool,
    pub hours: f64,
    pub exceeds_by: f64,
}

/// Local date of the first day of the week containing `ts`.
pub fn week_start_date(ts: DateTime<Utc>, tz: Tz, week_start: Weekday) -> NaiveDate {
    let local = ts.with_timezone(&tz).date_naive();
    let offset = (7 + local.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    local - Duration::days(i64::from(offset))
}

pub fn week_bucket_key(ts: DateTime<Utc>, tz: Tz, week_start: Weekday) -> String {
    week_start_date(ts, tz, week_start).format(WEEK_KEY_FORMAT).to_string()
}

pub fn current_week_bucket(tz: Tz, week_start: Weekday) -> String {
    week_bucket_key(Utc::now(), tz, week_start)
}

pub fn week_range(reference: DateTime<Utc>, tz: Tz, week_start: Weekday) -> WeekRange {
    let first_day = week_start_date(reference, tz, week_start);
    WeekRange {
        start: local_midnight(first_day, tz),
        end: local_midnight(first_day + Duration::days(7), tz),
    }
}

/// Parses a key produced by [`week_bucket_key`] back into its range.
pub fn week_range_for_key(key: &str, tz: Tz) -> Option<WeekRange> {
    let first_day = NaiveDate::parse_from_str(key, WEEK_KEY_FORMAT).ok()?;
    Some(WeekRange {
        start: local_midnight(first_day, tz),
        end: local_midnight(first_day + Duration::days(7), tz),
    })
}

pub fn is_within_range(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= ts && ts < end
}

/// Flags sessions longer than `max_hours`, or negative spans.
pub fn validate_session_duration(start: DateTime<Utc>, end: DateTime<Utc>, max_hours: f64) -> SessionDurationCheck {
    let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
    let exceeds_by = (hours - max_hours).max(0.0);
    SessionDurationCheck {
        valid: hours >= 0.0 && exceeds_by == 0.0,
        hours,
        exceeds_by,
    }
}

/// First instant of `date` in `tz`.
///
/// Midnight can be skipped (DST gap) or repeated in some zones; a skipped
/// midnight resolves to the first valid local minute after it, a repeated one
/// to the earlier instant.
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let mut probe = midnight;
    for _ in 0..(24 * 4) {
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => probe += Duration::minutes(15),
        }
    }
    Utc.from_utc_datetime(&midnight)
}
