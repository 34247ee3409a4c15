//! Formatting helpers shared across renderers.

use chrono::{DateTime, Local, Utc};

use crate::types::CanonicalMessage;

/// Clock text for a message: the display label when the server's time could
/// not be parsed (or was repaired off the sender), otherwise local `HH:MM`.
pub fn message_time(msg: &CanonicalMessage) -> String {
    match &msg.display_label {
        Some(label) => label.clone(),
        None => format_clock(msg.event_time),
    }
}

/// Format a timestamp as local `HH:MM`.
pub fn format_clock(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}
