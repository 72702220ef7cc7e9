//! Display formatting for sizes and deletion timestamps.

use chrono::{DateTime, Utc};

use crate::error::{RecbinError, Result};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
pub const FILETIME_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

/// Significant decimal digits of a FILETIME that survive truncation.
pub const FILETIME_DIGITS: usize = 11;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered deletion time used when conversion fails.
pub const EPOCH_DISPLAY: &str = "1970-01-01 00:00:00";

/// Convert a raw FILETIME into Unix seconds.
///
/// The decimal rendering of the value is cut to its first eleven
/// characters before the epoch offset is subtracted. For present-day
/// FILETIMEs (17 digits) this equals dividing by 10^6 rather than 10^7, so
/// the result is not a true second count for arbitrary inputs. The rule is
/// kept as-is so rendered times stay comparable with existing reports.
pub fn filetime_to_unix_seconds(raw: i64) -> i64 {
    let digits = raw.to_string();
    let truncated: String = digits.chars().take(FILETIME_DIGITS).collect();
    truncated.parse::<i64>().unwrap_or_default() - FILETIME_EPOCH_OFFSET_SECS
}

/// Convert Unix seconds into a UTC datetime.
pub fn unix_seconds_to_datetime(seconds: i64) -> Result<DateTime<Utc>> {
    if seconds < 0 {
        return Err(RecbinError::TimestampConversion { seconds });
    }

    DateTime::from_timestamp(seconds, 0).ok_or(RecbinError::TimestampConversion { seconds })
}

/// Render a raw FILETIME as `YYYY-MM-DD HH:MM:SS`, falling back to the epoch.
pub fn format_delete_time(raw: i64) -> String {
    let seconds = filetime_to_unix_seconds(raw);
    match unix_seconds_to_datetime(seconds) {
        Ok(datetime) => datetime.format(TIMESTAMP_FORMAT).to_string(),
        Err(e) => {
            tracing::error!(raw, "{}", e);
            EPOCH_DISPLAY.to_string()
        }
    }
}

/// Whole kilobytes as reported by Explorer: always rounded up past zero.
pub fn size_in_kb(bytes: u64) -> u64 {
    bytes / 1024 + 1
}

/// Format a byte count as `<n> KB` with thousands separators.
pub fn format_size_kb(bytes: u64) -> String {
    format!("{} KB", group_thousands(size_in_kb(bytes)))
}

/// Format a byte count as `<n> KB` without separators, as reported for
/// files nested in a deleted folder.
pub fn format_size_kb_plain(bytes: u64) -> String {
    format!("{} KB", size_in_kb(bytes))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_truncation() {
        assert_eq!(filetime_to_unix_seconds(13_281_793_500_000_000), 1_637_319_900);
    }

    #[test]
    fn test_format_delete_time() {
        assert_eq!(format_delete_time(13_281_793_500_000_000), "2021-11-19 11:05:00");
    }

    #[test]
    fn test_format_delete_time_is_after_epoch() {
        let formatted = format_delete_time(13_281_793_500_000_000);
        let parsed = chrono::NaiveDateTime::parse_from_str(&formatted, TIMESTAMP_FORMAT).unwrap();
        let epoch = chrono::NaiveDateTime::parse_from_str(EPOCH_DISPLAY, TIMESTAMP_FORMAT).unwrap();

        assert!(parsed > epoch);
        assert!(parsed.and_utc() < Utc::now());
    }

    #[test]
    fn test_negative_timestamp_falls_back_to_epoch() {
        assert_eq!(format_delete_time(-13_281_793_500_000_000), EPOCH_DISPLAY);
        assert_eq!(format_delete_time(0), EPOCH_DISPLAY);
        assert_eq!(format_delete_time(1_234), EPOCH_DISPLAY);
    }

    #[test]
    fn test_unix_seconds_rejects_negative() {
        let err = unix_seconds_to_datetime(-1).unwrap_err();
        assert!(matches!(err, RecbinError::TimestampConversion { seconds: -1 }));
    }

    #[test]
    fn test_size_formatting() {
        assert_eq!(format_size_kb(0), "1 KB");
        assert_eq!(format_size_kb(1023), "1 KB");
        assert_eq!(format_size_kb(4096), "5 KB");
        assert_eq!(format_size_kb(1024 * 1024), "1,025 KB");
        assert_eq!(format_size_kb(5 * 1024 * 1024 * 1024), "5,242,881 KB");
        assert_eq!(format_size_kb_plain(4096), "5 KB");
        assert_eq!(format_size_kb_plain(1024 * 1024), "1025 KB");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(7), "7");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(123_456_789), "123,456,789");
    }
}
