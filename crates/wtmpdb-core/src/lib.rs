//! Session-accounting engine for wtmpdb.
//!
//! Pure logic only: the record model, timestamp and duration formatting,
//! and the correlator that turns a store scan into a rendered report.
//! Reading and writing the database lives in `wtmpdb-db`.

mod entry;
mod report;
mod timefmt;

pub use entry::{RecordType, SessionEntry, BOOT_LABEL, BOOT_TTY, BOOT_USER, USEC_PER_SEC};
pub use report::{correlate, correlate_in, pad_column, Report, ReportLine, SessionFate};
pub use timefmt::{format_duration, format_time, format_time_in, TimeFormat};
