//! Timestamp encoding for stored records.
//!
//! New rows are always written in [`encode`]'s RFC 3339 form. Older writers
//! used other layouts, so [`decode`] walks a list of known layouts, newest
//! first, and only fails when none of them match.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::utils::StoreError;

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// Current writer: `2024-05-01T12:30:00.000000000Z`.
    Rfc3339,
    /// Explicit numeric offset, e.g. `2024-05-01 12:30:00.123+02:00`.
    Offset(&'static str),
    /// No zone information; interpreted as UTC.
    Naive(&'static str),
    /// Seconds since the epoch stored as text.
    UnixSeconds,
}

const LAYOUTS: &[Layout] = &[
    Layout::Rfc3339,
    Layout::Offset("%Y-%m-%d %H:%M:%S%.f%:z"),
    Layout::Offset("%Y-%m-%d %H:%M:%S%.f %z"),
    Layout::Naive("%Y-%m-%d %H:%M:%S%.f"),
    Layout::Naive("%Y-%m-%dT%H:%M:%S%.f"),
    Layout::UnixSeconds,
];

/// Canonical text form for a record timestamp.
pub fn encode(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp written by any known writer version.
pub fn decode(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    let trimmed = strip_zone_name(raw.trim());
    LAYOUTS
        .iter()
        .find_map(|layout| try_layout(*layout, trimmed))
        .ok_or_else(|| StoreError::Timestamp(raw.to_string()))
}

fn try_layout(layout: Layout, raw: &str) -> Option<DateTime<Utc>> {
    match layout {
        Layout::Rfc3339 => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Layout::Offset(fmt) => DateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Layout::Naive(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|naive| naive.and_utc()),
        Layout::UnixSeconds => raw
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

/// Drop a trailing zone abbreviation such as `UTC` in
/// `2024-05-01 12:30:00 +0000 UTC`; the numeric offset already carries it.
fn strip_zone_name(raw: &str) -> &str {
    match raw.rsplit_once(' ') {
        Some((head, tail))
            if !tail.is_empty()
                && tail.chars().all(|c| c.is_ascii_uppercase())
                && head.contains(' ') =>
        {
            head
        }
        _ => raw,
    }
}
