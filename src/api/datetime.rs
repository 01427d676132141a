//! Date/time input and output formats
//!
//! Timestamps are stored as naive UTC date/times, they go out as `DD MonthName YYYY HH:MM:SS`.

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::Serializer;

/// Output format of all timestamps
pub const DISPLAY_FORMAT: &str = "%d %B %Y %H:%M:%S";

/// Naive input formats, tried in order
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Render a timestamp, e.g. `05 March 2024 14:07:09`
pub fn display(datetime: &NaiveDateTime) -> String {
    datetime.format(DISPLAY_FORMAT).to_string()
}

/// Serde helper to serialize a timestamp with [`display`](display)
pub fn serialize<S>(datetime: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&display(datetime))
}

/// Parse a timestamp from user input
///
/// RFC 3339 values are converted to UTC, naive values are taken as UTC, a bare date means
/// midnight
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.naive_utc());
    }

    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
