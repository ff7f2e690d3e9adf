//! Date/time utilities for Teahouse.
//!
//! Timestamps are stored as fixed-width UTC text so that SQL string
//! comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// Storage format for every timestamp column.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current time, truncated to the precision that survives a storage round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage.
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

/// Parse a stored timestamp.
pub fn from_storage(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, STORAGE_FORMAT).map(|naive| naive.and_utc())
}

/// Milliseconds since the Unix epoch.
pub fn to_epoch_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Calendar date prefix (`YYYY-MM-DD`) used in post identifiers.
pub fn date_prefix(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_storage_round_trip_keeps_microseconds() {
        let dt = now();
        let parsed = from_storage(&to_storage(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_storage_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = a + Duration::microseconds(1);
        assert_eq!(to_storage(&a), "2024-01-02 03:04:05.000000");
        assert_eq!(to_storage(&b), "2024-01-02 03:04:05.000001");
        assert!(to_storage(&a) < to_storage(&b));
    }

    #[test]
    fn test_from_storage_invalid() {
        assert!(from_storage("yesterday").is_err());
    }

    #[test]
    fn test_to_epoch_millis() {
        let dt = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 1).unwrap();
        assert_eq!(to_epoch_millis(&dt), 1000);
    }

    #[test]
    fn test_date_prefix() {
        let dt = Utc.with_ymd_and_hms(2016, 3, 7, 23, 59, 0).unwrap();
        assert_eq!(date_prefix(&dt), "2016-03-07");
    }
}
