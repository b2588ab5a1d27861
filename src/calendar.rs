//! Calendar <-> epoch conversion for the system clock.
//!
//! The system clock counts seconds since 1970-01-01 00:00:00 in a `u32`
//! and carries no time zone; whatever wall-clock time the central sends
//! is stored as-is and handled as UTC.

use core::fmt::Write;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use heapless::String;

/// Smallest year the clock accepts.
pub const MIN_YEAR: u16 = 1970;
/// Largest year the clock accepts (well inside the `u32` epoch range).
pub const MAX_YEAR: u16 = 2099;

/// Seconds since the epoch, or `None` when `when` does not fit the clock.
pub fn to_epoch(when: &NaiveDateTime) -> Option<u32> {
    u32::try_from(when.and_utc().timestamp()).ok()
}

pub fn from_epoch(secs: u32) -> NaiveDateTime {
    DateTime::<Utc>::from_timestamp(i64::from(secs), 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default()
}

/// Render as `DD/MM/YY HH:MM`.
pub fn render(when: &NaiveDateTime) -> String<14> {
    let mut s = String::new();
    let _ = write!(
        s,
        "{:02}/{:02}/{:02} {:02}:{:02}",
        when.day(),
        when.month(),
        when.year() % 100,
        when.hour(),
        when.minute()
    );
    s
}
