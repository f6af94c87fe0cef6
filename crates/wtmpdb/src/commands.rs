//! The three verbs: report session history, open a boot session, close it.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use wtmpdb_core::{correlate, format_time, RecordType, TimeFormat, BOOT_TTY, BOOT_USER};
use wtmpdb_db::SessionDb;

/// `last`: scan the store, correlate, print one line per entry and the
/// trailing "begins" footer.
pub fn run_last(database: &Path, json: bool) -> Result<()> {
    let db = SessionDb::open_at(database)
        .with_context(|| format!("Couldn't open {}", database.display()))?;
    let entries = db
        .sessions()
        .scan_all()
        .context("Couldn't read all wtmp entries")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let report = correlate(&entries);
    for line in &report.lines {
        println!("{}", line.text);
    }

    match report.begins {
        Some(begins) => println!(
            "\n{} begins {}",
            database.display(),
            format_time(begins, TimeFormat::Full)
        ),
        None => println!("\n{} has no entries", database.display()),
    }

    Ok(())
}

/// `reboot`: append a boot entry — pseudo-user "reboot" on the "~" tty,
/// the kernel release in the host field, no logout yet.
pub fn run_reboot(database: &Path) -> Result<()> {
    let db = SessionDb::open_at(database)
        .with_context(|| format!("Couldn't open {}", database.display()))?;

    let time = now_usec();
    let release = kernel_release();
    db.sessions()
        .append_login(RecordType::BootTime, BOOT_USER, time, BOOT_TTY, &release, None)
        .context("Couldn't write boot entry")?;

    Ok(())
}

/// `shutdown`: close the most recent open boot entry at the current time.
pub fn run_shutdown(database: &Path) -> Result<()> {
    let db = SessionDb::open_at(database)
        .with_context(|| format!("Couldn't open {}", database.display()))?;
    let sessions = db.sessions();

    let id = sessions
        .find_open_id(BOOT_TTY)
        .context("Couldn't get ID for reboot entry")?;
    sessions
        .set_logout(id, now_usec())
        .context("Couldn't write shutdown entry")?;

    Ok(())
}

fn now_usec() -> i64 {
    Utc::now().timestamp_micros()
}

/// Release string of the running kernel, via uname(2). An empty string
/// on failure; the field is informational.
fn kernel_release() -> String {
    // SAFETY: utsname is plain old data; uname either fills it or fails.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return String::new();
    }

    // SAFETY: uname NUL-terminates every field.
    let release = unsafe { std::ffi::CStr::from_ptr(uts.release.as_ptr()) };
    release.to_string_lossy().into_owned()
}
