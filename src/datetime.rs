//! Date/time helpers.
//!
//! SQLite stores timestamps as UTC text in `YYYY-MM-DD HH:MM:SS` form.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a database datetime string to RFC3339 for API responses.
///
/// ```
/// use course_archive::datetime::to_rfc3339;
///
/// assert_eq!(to_rfc3339("2024-01-15 10:30:00"), "2024-01-15T10:30:00Z");
/// ```
pub fn to_rfc3339(datetime_str: &str) -> String {
    format!("{}Z", datetime_str.replace(' ', "T"))
}

/// Parse a stored timestamp. Accepts the SQLite format, RFC3339, or a bare date
/// (interpreted as the end of that day).
pub fn parse_stored(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, SQL_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

/// Format a UTC instant in the storage format.
pub fn to_stored(dt: &DateTime<Utc>) -> String {
    dt.format(SQL_FORMAT).to_string()
}
