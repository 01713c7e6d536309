//! Utility functions for path handling and time formatting.
//!
//! This module provides helper functions used throughout the Ratatosk bot
//! for file system paths, humanized elapsed times and alert delay parsing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Constructs a file system path by joining a directory path with a subpath.
///
/// This is a convenience function that combines path components and returns a
/// platform-independent path string. It handles the path separator automatically
/// based on the operating system.
///
/// # Arguments
///
/// * `dir_path` - The base directory path
/// * `subdir_path` - The subdirectory or file name to append
///
/// # Returns
///
/// A `String` containing the joined path.
///
/// # Examples
///
/// ```
/// # use ratatosk::utils::get_path;
/// let path = get_path("/home/user", "store.db");
/// assert_eq!(path, "/home/user/store.db");
/// ```
pub fn get_path(dir_path: &str, subdir_path: &str) -> String {
    let path_buf: PathBuf = [dir_path, subdir_path].iter().collect();
    path_buf.to_string_lossy().into_owned()
}

/// Formats the time elapsed since `then` as a short human-readable phrase.
///
/// Delivered tells are attributed with the age of the message, so the
/// formatting favours the largest sensible unit over precision.
///
/// # Arguments
///
/// * `then` - The moment the message was stored
/// * `now` - The current time
///
/// # Returns
///
/// A phrase such as `"5 minutes ago"`, `"2 hours ago"` or `"just now"` for
/// anything under a minute (including clock skew into the future).
pub fn humanize_elapsed(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();

    if seconds < 60 {
        return "just now".to_owned();
    }

    let (value, unit) = if seconds < 3600 {
        (seconds / 60, "minute")
    } else if seconds < 86400 {
        (seconds / 3600, "hour")
    } else {
        (seconds / 86400, "day")
    };

    if value == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", value, unit)
    }
}

/// Parses an alert delay such as `10m`, `2h` or `1d` into seconds.
///
/// # Arguments
///
/// * `raw` - The delay token, a positive integer followed by a unit
///   (`m` for minutes, `h` for hours, `d` for days)
///
/// # Returns
///
/// * `Some(seconds)` - The delay converted to seconds
/// * `None` - The token is empty, has no unit, a bad unit, a zero value or
///   a value whose conversion to seconds overflows
pub fn parse_delay(raw: &str) -> Option<i64> {
    if raw.len() < 2 {
        return None;
    }

    let (digits, unit) = raw.split_at(raw.len() - 1);
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }

    let factor = match unit {
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return None,
    };
    value.checked_mul(factor)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_get_path_simple() {
        let path = get_path("/home/user", "store.db");
        #[cfg(unix)]
        assert_eq!(path, "/home/user/store.db");
        #[cfg(windows)]
        assert_eq!(path, "\\home\\user\\store.db");
    }

    #[test]
    fn test_get_path_relative() {
        let path = get_path(".", "data");
        #[cfg(unix)]
        assert_eq!(path, "./data");
        #[cfg(windows)]
        assert_eq!(path, ".\\data");
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_humanize_elapsed_just_now() {
        assert_eq!(humanize_elapsed(at(1000), at(1030)), "just now");
    }

    #[test]
    fn test_humanize_elapsed_future_clock_skew() {
        assert_eq!(humanize_elapsed(at(1030), at(1000)), "just now");
    }

    #[test]
    fn test_humanize_elapsed_singular_minute() {
        assert_eq!(humanize_elapsed(at(0), at(90)), "1 minute ago");
    }

    #[test]
    fn test_humanize_elapsed_minutes() {
        assert_eq!(humanize_elapsed(at(0), at(300)), "5 minutes ago");
    }

    #[test]
    fn test_humanize_elapsed_hours() {
        assert_eq!(humanize_elapsed(at(0), at(7200)), "2 hours ago");
    }

    #[test]
    fn test_humanize_elapsed_days() {
        assert_eq!(humanize_elapsed(at(0), at(86400 * 3)), "3 days ago");
    }

    #[test]
    fn test_parse_delay_minutes() {
        assert_eq!(parse_delay("10m"), Some(600));
    }

    #[test]
    fn test_parse_delay_hours() {
        assert_eq!(parse_delay("2h"), Some(7200));
    }

    #[test]
    fn test_parse_delay_days() {
        assert_eq!(parse_delay("1d"), Some(86400));
    }

    #[test]
    fn test_parse_delay_rejects_zero() {
        assert_eq!(parse_delay("0m"), None);
    }

    #[test]
    fn test_parse_delay_rejects_bad_unit() {
        assert_eq!(parse_delay("10x"), None);
    }

    #[test]
    fn test_parse_delay_rejects_overflowing_value() {
        // Parses as i64 but cannot be converted to seconds.
        assert_eq!(parse_delay("9000000000000000000m"), None);
    }

    #[test]
    fn test_parse_delay_rejects_missing_value() {
        assert_eq!(parse_delay("m"), None);
    }
}
