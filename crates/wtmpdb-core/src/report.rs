//! The session correlator: classify every scanned entry and render it
//! as one fixed-width report line.

use chrono::{Local, TimeZone};

use crate::entry::{RecordType, SessionEntry, BOOT_LABEL};
use crate::timefmt::{format_duration, format_time_in, TimeFormat};

/// How the correlator classified an entry's end of life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFate {
    /// Closed cleanly at the given microsecond timestamp.
    LoggedOut(i64),
    /// Open user session, no later boot seen in the scan.
    StillLoggedIn,
    /// Open boot entry; the machine is up.
    StillRunning,
    /// Open session superseded by a later boot: presumed terminated by
    /// the crash/reboot rather than still running.
    Crashed,
    /// Open entry of a kind this engine does not know.
    UnknownKind(i64),
}

/// One classified, rendered report line.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub fate: SessionFate,
    pub text: String,
}

/// The rendered report plus the earliest login seen across the scan,
/// which seeds the trailing "begins" footer. `None` for an empty scan.
#[derive(Debug, Clone)]
pub struct Report {
    pub lines: Vec<ReportLine>,
    pub begins: Option<i64>,
}

/// Correlate a store scan into a report, formatting times in `tz`.
///
/// The scan must be ordered most-recent-first: crash inference works by
/// latching once a boot entry is seen, so every open session that
/// appears after it in the scan (older in wall time, never closed
/// before the machine went down) is classified as crashed. The store
/// adapter owns that ordering contract.
pub fn correlate_in<Tz: TimeZone>(entries: &[SessionEntry], tz: &Tz) -> Report
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = Vec::with_capacity(entries.len());
    let mut begins: Option<i64> = None;
    let mut after_reboot = false;

    for entry in entries {
        let fate = match entry.logout_time {
            Some(logout) => SessionFate::LoggedOut(logout),
            None if after_reboot => SessionFate::Crashed,
            None => match entry.kind {
                RecordType::UserProcess => SessionFate::StillLoggedIn,
                RecordType::BootTime => SessionFate::StillRunning,
                RecordType::Other(code) => SessionFate::UnknownKind(code),
            },
        };

        let tty = if entry.kind == RecordType::BootTime {
            after_reboot = true;
            BOOT_LABEL
        } else {
            entry.tty.as_str()
        };

        let (logout_col, duration) = match fate {
            SessionFate::LoggedOut(logout) => (
                format_time_in(tz, logout, TimeFormat::ClockOnly),
                format_duration(entry.login_time, logout),
            ),
            SessionFate::StillLoggedIn => ("still".to_string(), "logged in".to_string()),
            SessionFate::StillRunning => ("still".to_string(), "running".to_string()),
            SessionFate::Crashed => ("crash".to_string(), String::new()),
            SessionFate::UnknownKind(code) => ("ERROR".to_string(), format!("Unknown: {}", code)),
        };

        let login_col = format_time_in(tz, entry.login_time, TimeFormat::WeekdayShort);
        let text = format!(
            "{} {} {} {} - {} {}",
            pad_column(&entry.user, 8, true),
            pad_column(tty, 12, false),
            pad_column(&entry.host, 16, true),
            pad_column(&login_col, 16, true),
            pad_column(&logout_col, 5, true),
            duration,
        );

        begins = Some(match begins {
            Some(earliest) => earliest.min(entry.login_time),
            None => entry.login_time,
        });
        lines.push(ReportLine { fate, text });
    }

    Report { lines, begins }
}

/// Correlate a store scan, formatting times in local time.
pub fn correlate(entries: &[SessionEntry]) -> Report {
    correlate_in(entries, &Local)
}

/// Left-justify `value` into a `width`-character column.
///
/// Width counts characters, so truncation never splits a multi-byte
/// code point. With `truncate = false` a long value keeps its natural
/// length and only short values get padded.
pub fn pad_column(value: &str, width: usize, truncate: bool) -> String {
    let mut out: String = if truncate {
        value.chars().take(width).collect()
    } else {
        value.to_string()
    };

    let len = out.chars().count();
    if len < width {
        out.extend(std::iter::repeat(' ').take(width - len));
    }
    out
}
