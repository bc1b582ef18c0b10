//! Human-readable wall-clock timestamps.
//!
//! Timestamps use the classic `ctime` layout, e.g.
//! `Mon Jan  1 00:00:00 2024`. The first three fields (weekday, month,
//! day of month) identify the calendar day.

use chrono::{DateTime, Local, TimeZone};

/// `strftime` layout of a stored timestamp.
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Returns the current local time as a stored timestamp.
#[must_use]
pub fn now() -> String {
    format(&Local::now())
}

/// Formats any zoned time as a stored timestamp.
#[must_use]
pub fn format<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(CTIME_FORMAT).to_string()
}

/// Returns whether two timestamps fall on the same calendar day.
///
/// Only the date portion is compared; the padding of the day of month does
/// not matter.
#[must_use]
pub fn same_day(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .take(3)
        .eq(b.split_whitespace().take(3))
}
