//! Default values substituted for unset request fields.
//!
//! Numeric fields treat both `None` and `0` as unset so zero-filled GUI payloads pick up the
//! defaults. String fields treat blank and whitespace-only values as unset.

use std::path::PathBuf;

pub const PREVIEW_PORT: u16 = 8080;
pub const CONCURRENCY: u32 = 1;
pub const RETRY_LIMIT: u32 = 1;
pub const BATCH_SIZE: u32 = 1;
pub const JOB_RETRIES: u32 = 3;
/// Backoff between scheduled job attempts, as a duration literal.
pub const JOB_BACKOFF: &str = "2s";
pub const SCHEDULER_DB: &str = "mailgrid.db";

/// Return `value` unless it is missing or zero.
pub fn positive_or<T>(value: Option<T>, default: T) -> T
where
    T: Copy + Default + PartialEq,
{
    value.filter(|v| *v != T::default()).unwrap_or(default)
}

/// Return `value` unless it is blank after trimming.
pub fn non_blank_or(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Scheduler persistence path, falling back to `mailgrid.db`.
pub fn scheduler_db_or_default(value: &str) -> PathBuf {
    PathBuf::from(non_blank_or(value, SCHEDULER_DB))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_missing_fall_back() {
        assert_eq!(positive_or(None, CONCURRENCY), 1);
        assert_eq!(positive_or(Some(0), JOB_RETRIES), 3);
        assert_eq!(positive_or(Some(0u16), PREVIEW_PORT), 8080);
        assert_eq!(positive_or(Some(12), BATCH_SIZE), 12);
    }

    #[test]
    fn blank_strings_fall_back() {
        assert_eq!(non_blank_or("", JOB_BACKOFF), "2s");
        assert_eq!(non_blank_or("  \t", JOB_BACKOFF), "2s");
        assert_eq!(non_blank_or("5m", JOB_BACKOFF), "5m");
        assert_eq!(scheduler_db_or_default(" "), PathBuf::from("mailgrid.db"));
        assert_eq!(scheduler_db_or_default("jobs.db"), PathBuf::from("jobs.db"));
    }
}
