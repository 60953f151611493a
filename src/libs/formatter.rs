//! Duration and money formatting for console output and exports.
//!
//! Durations use an `HH:MM` pattern with zero-padded hours and minutes.
//! Negative values are shown as `00:00`; hours are not capped at 24.
//!
//! ```rust
//! use punchclock::libs::formatter::{format_duration, format_minutes};
//! use chrono::Duration;
//!
//! assert_eq!(format_duration(&(Duration::hours(2) + Duration::minutes(30))), "02:30");
//! assert_eq!(format_minutes(55), "00:55");
//! ```

use chrono::Duration;

pub fn format_duration(duration: &Duration) -> String {
    let hours = duration.num_hours();
    let mins = duration.num_minutes() % 60;
    format!("{:02}:{:02}", hours.max(0), mins.max(0))
}

pub fn format_minutes(minutes: i64) -> String {
    format_duration(&Duration::minutes(minutes))
}

/// Milliseconds as `HH:MM:SS`, for the live timer.
pub fn format_clock(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Integer cents as a decimal amount, e.g. `-1205` → `-12.05`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_and_money() {
        assert_eq!(format_clock(3_723_000), "01:02:03");
        assert_eq!(format_cents(-1205), "-12.05");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_minutes(-5), "00:00");
    }
}
