//! Timestamp derivation
//!
//! Server timestamps arrive in a handful of shapes (`2024/01/02 10:00`,
//! RFC 3339, epoch seconds, ...). Parse variants are tried in order and the
//! first valid time wins. When nothing parses, the event time falls back to
//! "now" and the original text is kept as the display label.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Naive layouts, interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Epoch values with at least this many digits are milliseconds
const EPOCH_MILLIS_DIGITS: usize = 12;

/// Resolve the event time and optional display label for an entry.
///
/// - no source: `(now, None)`
/// - parseable source: `(parsed, None)`
/// - unparseable source: `(now, Some(source verbatim))`
pub fn derive_event_time(source: Option<&str>, now: DateTime<Utc>) -> (DateTime<Utc>, Option<String>) {
    match source {
        None => (now, None),
        Some(source) => match parse_timestamp(source) {
            Some(time) => (time, None),
            None => {
                tracing::debug!(source = %source, "Unparseable timestamp, keeping it as a label");
                (now, Some(source.to_string()))
            }
        },
    }
}

/// Parse a server timestamp, or `None` if no variant accepts it.
pub fn parse_timestamp(source: &str) -> Option<DateTime<Utc>> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(time) = parse_epoch(trimmed) {
        return Some(time);
    }

    let normalized = trimmed.replace('/', "-");
    let with_separator = normalized.replacen(' ', "T", 1);

    let rfc3339 = [
        normalized.clone(),
        with_separator.clone(),
        format!("{}Z", with_separator),
    ]
    .into_iter()
    .find_map(|candidate| DateTime::parse_from_rfc3339(&candidate).ok());
    if let Some(time) = rfc3339 {
        return Some(time.with_timezone(&Utc));
    }

    if let Ok(time) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(time.with_timezone(&Utc));
    }

    let naive = normalized.trim_end_matches('Z');
    if let Some(time) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
    {
        return Some(Utc.from_utc_datetime(&time));
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| Utc.from_utc_datetime(&time))
}

fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    if text.len() < 9 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = text.parse().ok()?;
    if text.len() >= EPOCH_MILLIS_DIGITS {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}
