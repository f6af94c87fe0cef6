//! Timestamp and elapsed-duration rendering for the report.

use chrono::{Local, LocalResult, TimeZone};

use crate::entry::USEC_PER_SEC;

/// Rendering mode for a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `ctime`-style calendar string (`"Mon Sep  4 10:00:00 2023"`),
    /// used once per report as the "begins" footer.
    Full,
    /// `"Www Mon  d HH:MM"` (16 columns), the login column.
    WeekdayShort,
    /// `"HH:MM"`, the logout column.
    ClockOnly,
}

/// Format a microsecond timestamp in the given timezone.
///
/// A timestamp outside the representable calendar range renders as the
/// literal `"invalid"`; the store's lenient decoding can hand us
/// arbitrary values and formatting must not panic on them.
pub fn format_time_in<Tz: TimeZone>(tz: &Tz, usec: i64, format: TimeFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let pattern = match format {
        TimeFormat::Full => "%a %b %e %H:%M:%S %Y",
        TimeFormat::WeekdayShort => "%a %b %e %H:%M",
        TimeFormat::ClockOnly => "%H:%M",
    };

    match tz.timestamp_opt(usec / USEC_PER_SEC, 0) {
        LocalResult::Single(t) => t.format(pattern).to_string(),
        _ => "invalid".to_string(),
    }
}

/// Format a microsecond timestamp in local time.
pub fn format_time(usec: i64, format: TimeFormat) -> String {
    format_time_in(&Local, usec, format)
}

/// Render the elapsed time between a login/logout pair, in microseconds.
///
/// Three mutually exclusive shapes, first match wins:
/// `"(D+HH:MM)"` once a full day has elapsed, `" (HH:MM)"` with a
/// leading space below that, `" (00:MM)"` under an hour. The leading
/// space is part of the value: the report line appends the duration
/// directly after one separating space, and the day form deliberately
/// sits one column further left.
pub fn format_duration(login_usec: i64, logout_usec: i64) -> String {
    let secs = (logout_usec - login_usec) / USEC_PER_SEC;
    let mins = (secs / 60) % 60;
    let hours = (secs / 3600) % 24;
    let days = secs / 86400;

    if days > 0 {
        format!("({}+{:02}:{:02})", days, hours, mins)
    } else if hours > 0 {
        format!(" ({:02}:{:02})", hours, mins)
    } else {
        format!(" (00:{:02})", mins)
    }
}
