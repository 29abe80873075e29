//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Format a timestamp in the site's timezone
///
/// Unknown timezone names fall back to UTC.
///
/// # Examples
/// ```ignore
/// format_date(&created_at, "Europe/Paris", "%Y-%m-%d") // -> "2024-01-15"
/// ```
pub fn format_date(date: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    tz.from_utc_datetime(&date.naive_utc())
        .format(format)
        .to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}
