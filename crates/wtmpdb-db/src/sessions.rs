//! Session store: append, close, look up, and scan accounting rows.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;
use thiserror::Error;
use tracing::{debug, warn};

use wtmpdb_core::{RecordType, SessionEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The table does not have the expected eight columns. This is
    /// store corruption, never downgraded to skip-and-continue.
    #[error("Mangled entry: expected 8 columns, got: {0}")]
    MangledSchema(String),

    #[error("No entry with id {0}")]
    NoSuchEntry(i64),

    /// The row already carries a logout time; closing a session is a
    /// once-only operation.
    #[error("Entry {0} is already closed")]
    AlreadyClosed(i64),

    #[error("No open entry for tty '{0}'")]
    NoOpenEntry(String),
}

/// A numeric column decoded best-effort: the value the scan will use,
/// plus a warning describing what was wrong with the raw field, if
/// anything. The caller decides whether warnings escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LenientUsec {
    pub usec: i64,
    pub warning: Option<String>,
}

/// Session store with a borrowed connection.
pub struct Sessions<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Sessions<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Append a login-only entry and return the assigned row id.
    pub fn append_login(
        &self,
        kind: RecordType,
        user: &str,
        login_usec: i64,
        tty: &str,
        host: &str,
        service: Option<&str>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO wtmp (Type, User, Login, TTY, RemoteHost, Service)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![kind.code(), user, login_usec, tty, host, service],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, user, tty, "appended login entry");
        Ok(id)
    }

    /// Write the logout timestamp for `id`.
    ///
    /// The UPDATE is conditional on the row still being open, so the
    /// close-once contract holds even against concurrent writers; a
    /// miss is then split into "no such row" and "already closed".
    pub fn set_logout(&self, id: i64, logout_usec: i64) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE wtmp SET Logout = ?1 WHERE ID = ?2 AND Logout IS NULL",
            params![logout_usec, id],
        )?;
        if updated == 1 {
            debug!(id, "closed entry");
            return Ok(());
        }

        let exists: Option<i64> = self
            .conn
            .query_row("SELECT ID FROM wtmp WHERE ID = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match exists {
            Some(_) => Err(StoreError::AlreadyClosed(id)),
            None => Err(StoreError::NoSuchEntry(id)),
        }
    }

    /// Id of the most recent open entry on `tty`.
    pub fn find_open_id(&self, tty: &str) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT ID FROM wtmp WHERE TTY = ?1 AND Logout IS NULL
                 ORDER BY Login DESC, ID DESC LIMIT 1",
                params![tty],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NoOpenEntry(tty.to_string()))
    }

    /// Full scan, most recent login first.
    ///
    /// The `Login DESC, ID DESC` order is a contract the correlator's
    /// crash inference depends on: a boot row must be scanned before
    /// the older open sessions it supersedes. The secondary key keeps
    /// the order stable when two rows share a login timestamp.
    ///
    /// `SELECT *` is deliberate: the column count of the result is the
    /// arity check, and any width other than eight means the schema
    /// contract was violated.
    pub fn scan_all(&self) -> Result<Vec<SessionEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM wtmp ORDER BY Login DESC, ID DESC")?;
        if stmt.column_count() != 8 {
            return Err(StoreError::MangledSchema(stmt.column_names().join(", ")));
        }

        let rows = stmt.query_map([], Self::row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }

    fn row_to_entry(row: &rusqlite::Row) -> Result<SessionEntry, rusqlite::Error> {
        // ID, Type, User, Login, Logout, TTY, RemoteHost, Service
        let kind = RecordType::from_code(Self::numeric_field(row, 1, "Type")?);
        let login_time = Self::numeric_field(row, 3, "Login")?;
        let logout_time = match row.get_ref(4)? {
            ValueRef::Null => None,
            _ => Some(Self::numeric_field(row, 4, "Logout")?),
        };

        Ok(SessionEntry {
            id: row.get(0)?,
            kind,
            user: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            login_time,
            logout_time,
            tty: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            host: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            service: row.get(7)?,
        })
    }

    /// Decode a numeric column leniently, surfacing any warning on the
    /// diagnostic channel and continuing with the best-effort value.
    fn numeric_field(row: &rusqlite::Row, idx: usize, column: &str) -> Result<i64, rusqlite::Error> {
        let decoded = decode_usec(row.get_ref(idx)?, column);
        if let Some(warning) = decoded.warning {
            warn!("{}", warning);
        }
        Ok(decoded.usec)
    }
}

/// Decode one numeric column best-effort.
///
/// Clean integers pass through silently. Text goes through a
/// longest-prefix parse so a partially mangled field still yields a
/// usable value, with a warning. Anything else degrades to a warned
/// fallback rather than aborting the scan.
fn decode_usec(value: ValueRef<'_>, column: &str) -> LenientUsec {
    match value {
        ValueRef::Integer(n) if n >= 0 => LenientUsec {
            usec: n,
            warning: None,
        },
        ValueRef::Integer(n) => LenientUsec {
            usec: n,
            warning: Some(format!("Negative time entry for '{}': {}", column, n)),
        },
        ValueRef::Real(f) => LenientUsec {
            usec: f as i64,
            warning: Some(format!(
                "Invalid numeric time entry for '{}': '{}'",
                column, f
            )),
        },
        ValueRef::Text(bytes) => {
            let raw = String::from_utf8_lossy(bytes);
            let (usec, clean) = parse_prefix_i64(&raw);
            let warning = if clean {
                None
            } else {
                Some(format!(
                    "Invalid numeric time entry for '{}': '{}'",
                    column, raw
                ))
            };
            LenientUsec { usec, warning }
        }
        ValueRef::Null | ValueRef::Blob(_) => LenientUsec {
            usec: 0,
            warning: Some(format!(
                "Invalid numeric time entry for '{}': not a number",
                column
            )),
        },
    }
}

/// `strtoll`-style parse: skip leading whitespace, consume an optional
/// sign and the longest run of digits, saturating on overflow. Returns
/// the value and whether the whole input was a clean integer.
fn parse_prefix_i64(s: &str) -> (i64, bool) {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return (0, false);
    }

    let mut value: i64 = 0;
    let mut saturated = false;
    for byte in digits[..end].bytes() {
        let digit = (byte - b'0') as i64;
        match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(v) => value = v,
            None => {
                saturated = true;
                break;
            }
        }
    }

    if saturated {
        let value = if negative { i64::MIN } else { i64::MAX };
        return (value, false);
    }
    if negative {
        value = -value;
    }

    (value, end == digits.len() && trimmed.len() == s.len())
}
