//! Database layer for wtmpdb.
//!
//! Provides a `SessionDb` struct that owns the SQLite connection and
//! bootstraps the schema. Row operations live in the [`Sessions`] view.

mod sessions;

pub use sessions::{LenientUsec, Sessions, StoreError};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Compiled-in default database location.
pub const DEFAULT_DB_PATH: &str = "/var/lib/wtmpdb/wtmp.db";

/// The main database struct that owns the SQLite connection.
pub struct SessionDb {
    conn: Mutex<Connection>,
}

impl SessionDb {
    /// Open or create a database at the default location.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_DB_PATH)
    }

    /// Access the session store.
    pub fn sessions(&self) -> Sessions<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Sessions::new(conn)
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS wtmp (
                ID         INTEGER PRIMARY KEY AUTOINCREMENT,
                Type       INTEGER NOT NULL,
                User       TEXT NOT NULL,
                Login      INTEGER,
                Logout     INTEGER,
                TTY        TEXT,
                RemoteHost TEXT,
                Service    TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_wtmp_login ON wtmp(Login DESC);
            CREATE INDEX IF NOT EXISTS idx_wtmp_tty_open ON wtmp(TTY) WHERE Logout IS NULL;
            "#,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtmpdb_core::{RecordType, BOOT_TTY, BOOT_USER};

    #[test]
    fn test_append_and_scan_round_trip() {
        let db = SessionDb::open_in_memory().unwrap();

        let id = db
            .sessions()
            .append_login(
                RecordType::UserProcess,
                "root",
                1_693_821_600_000_000,
                "pts/0",
                "192.168.1.10",
                Some("sshd"),
            )
            .unwrap();

        let entries = db.sessions().scan_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].kind, RecordType::UserProcess);
        assert_eq!(entries[0].user, "root");
        assert_eq!(entries[0].login_time, 1_693_821_600_000_000);
        assert_eq!(entries[0].logout_time, None);
        assert_eq!(entries[0].tty, "pts/0");
        assert_eq!(entries[0].host, "192.168.1.10");
        assert_eq!(entries[0].service, Some("sshd".to_string()));
    }

    #[test]
    fn test_set_logout_completes_the_entry() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        let id = sessions
            .append_login(RecordType::UserProcess, "alice", 1_000_000, "pts/1", "", None)
            .unwrap();
        sessions.set_logout(id, 61_000_000).unwrap();

        let entries = sessions.scan_all().unwrap();
        assert_eq!(entries[0].logout_time, Some(61_000_000));
        assert_eq!(entries[0].logout_time.unwrap() - entries[0].login_time, 60_000_000);
    }

    #[test]
    fn test_set_logout_twice_is_a_contract_violation() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        let id = sessions
            .append_login(RecordType::UserProcess, "alice", 1_000_000, "pts/1", "", None)
            .unwrap();
        sessions.set_logout(id, 2_000_000).unwrap();

        let err = sessions.set_logout(id, 3_000_000).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyClosed(i) if i == id));

        // The first logout must survive untouched.
        let entries = sessions.scan_all().unwrap();
        assert_eq!(entries[0].logout_time, Some(2_000_000));
    }

    #[test]
    fn test_set_logout_on_missing_row() {
        let db = SessionDb::open_in_memory().unwrap();
        let err = db.sessions().set_logout(999, 1_000_000).unwrap_err();
        assert!(matches!(err, StoreError::NoSuchEntry(999)));
    }

    #[test]
    fn test_find_open_id_targets_the_boot_sentinel() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        // A closed boot, an open user session, then the current boot.
        let old_boot = sessions
            .append_login(RecordType::BootTime, BOOT_USER, 1_000_000, BOOT_TTY, "6.4.0", None)
            .unwrap();
        sessions.set_logout(old_boot, 2_000_000).unwrap();
        sessions
            .append_login(RecordType::UserProcess, "alice", 3_000_000, "pts/1", "", None)
            .unwrap();
        let current_boot = sessions
            .append_login(RecordType::BootTime, BOOT_USER, 4_000_000, BOOT_TTY, "6.4.0", None)
            .unwrap();

        assert_eq!(sessions.find_open_id(BOOT_TTY).unwrap(), current_boot);
    }

    #[test]
    fn test_find_open_id_misses_when_all_boots_are_closed() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        let id = sessions
            .append_login(RecordType::BootTime, BOOT_USER, 1_000_000, BOOT_TTY, "6.4.0", None)
            .unwrap();
        sessions.set_logout(id, 2_000_000).unwrap();

        let err = sessions.find_open_id(BOOT_TTY).unwrap_err();
        assert!(matches!(err, StoreError::NoOpenEntry(ref tty) if tty == BOOT_TTY));
    }

    #[test]
    fn test_scan_order_is_most_recent_login_first() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        // Inserted out of chronological order on purpose.
        let b = sessions
            .append_login(RecordType::UserProcess, "b", 2_000_000, "pts/1", "", None)
            .unwrap();
        let a = sessions
            .append_login(RecordType::UserProcess, "a", 3_000_000, "pts/2", "", None)
            .unwrap();
        let c = sessions
            .append_login(RecordType::UserProcess, "c", 1_000_000, "pts/3", "", None)
            .unwrap();
        // Same login time as `a`: the higher id wins the tie.
        let d = sessions
            .append_login(RecordType::UserProcess, "d", 3_000_000, "pts/4", "", None)
            .unwrap();

        let ids: Vec<i64> = sessions.scan_all().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![d, a, b, c]);
    }

    #[test]
    fn test_unknown_type_code_survives_a_round_trip() {
        let db = SessionDb::open_in_memory().unwrap();
        let sessions = db.sessions();

        sessions
            .append_login(RecordType::Other(12), "ghost", 1_000_000, "pts/9", "", None)
            .unwrap();

        let entries = sessions.scan_all().unwrap();
        assert_eq!(entries[0].kind, RecordType::Other(12));
    }

    #[test]
    fn test_open_at_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wtmp.db");

        let id = {
            let db = SessionDb::open_at(&path).unwrap();
            let id = db
                .sessions()
                .append_login(RecordType::BootTime, BOOT_USER, 1_000_000, BOOT_TTY, "6.4.0", None)
                .unwrap();
            id
        };

        let db = SessionDb::open_at(&path).unwrap();
        let entries = db.sessions().scan_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
    }
}
