use chrono::{DateTime, Local, TimeZone, Utc};

/// Human-readable age of `timestamp` relative to `now`.
///
/// Anything a week or older falls back to the local calendar date.
pub fn format_timestamp(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_timestamp_in(timestamp, now, &Local)
}

/// Like [`format_timestamp`], rendering the fallback date in `tz`.
pub fn format_timestamp_in<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    // Future timestamps (clock skew) read as "just now".
    let seconds = (now - timestamp).num_seconds().max(0);

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        ago(minutes, "minute")
    } else if hours < 24 {
        ago(hours, "hour")
    } else if days < 7 {
        ago(days, "day")
    } else {
        timestamp.with_timezone(tz).format("%m/%d/%Y").to_string()
    }
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}
