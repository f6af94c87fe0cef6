use serde::{Deserialize, Serialize};

/// tty sentinel used by whole-system boot/shutdown bracketing entries.
pub const BOOT_TTY: &str = "~";

/// Pseudo-user recorded on boot entries.
pub const BOOT_USER: &str = "reboot";

/// Channel label shown for boot entries in the report.
pub const BOOT_LABEL: &str = "system boot";

/// All timestamps are microseconds since the Unix epoch.
pub const USEC_PER_SEC: i64 = 1_000_000;

const BOOT_TIME_CODE: i64 = 2;
const USER_PROCESS_CODE: i64 = 7;

/// Kind of accounting record, stored as the integer `Type` column.
///
/// Wire codes follow the classic utmp constants (`BOOT_TIME = 2`,
/// `USER_PROCESS = 7`) so databases written by other tooling stay
/// readable. Codes this engine does not know are preserved in `Other`
/// and degrade visibly in the report instead of being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    UserProcess,
    BootTime,
    Other(i64),
}

impl RecordType {
    pub fn from_code(code: i64) -> Self {
        match code {
            BOOT_TIME_CODE => RecordType::BootTime,
            USER_PROCESS_CODE => RecordType::UserProcess,
            other => RecordType::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RecordType::BootTime => BOOT_TIME_CODE,
            RecordType::UserProcess => USER_PROCESS_CODE,
            RecordType::Other(code) => *code,
        }
    }
}

/// One row of accounting history.
///
/// Born with a login time only; `logout_time` is written at most once,
/// when the session closes. An entry with no logout is an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: i64,
    pub kind: RecordType,
    pub user: String,
    pub login_time: i64,
    pub logout_time: Option<i64>,
    pub tty: String,
    pub host: String,
    pub service: Option<String>,
}

impl SessionEntry {
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_codes_round_trip() {
        assert_eq!(RecordType::from_code(2), RecordType::BootTime);
        assert_eq!(RecordType::from_code(7), RecordType::UserProcess);
        assert_eq!(RecordType::from_code(42), RecordType::Other(42));

        for kind in [
            RecordType::BootTime,
            RecordType::UserProcess,
            RecordType::Other(42),
        ] {
            assert_eq!(RecordType::from_code(kind.code()), kind);
        }
    }

    #[test]
    fn test_entry_serializes_with_snake_case_kind() {
        let entry = SessionEntry {
            id: 1,
            kind: RecordType::UserProcess,
            user: "root".to_string(),
            login_time: 1_693_821_600_000_000,
            logout_time: None,
            tty: "pts/0".to_string(),
            host: String::new(),
            service: Some("sshd".to_string()),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""kind":"user_process""#));
        assert!(json.contains(r#""logout_time":null"#));

        let back: SessionEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
        assert!(back.is_open());
    }
}
