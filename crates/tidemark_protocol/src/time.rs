//! Last-modified-time formatting.
//!
//! The backend orders changes by a fixed-width ISO-8601 timestamp, so
//! lexicographic string comparison must equal chronological comparison.
//! Every producer of an LMT goes through [`format_timestamp`] to keep the
//! field widths exact.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Fixed-width LMT layout: `yyyy-MM-ddTHH:mm:ss.fffZ`.
pub const LMT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats an instant in the fixed-width LMT layout.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current instant in the fixed-width LMT layout.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parses a fixed-width LMT string back into an instant.
///
/// Returns `None` when the input does not match the layout.
pub fn parse_timestamp(lmt: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(lmt, LMT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
