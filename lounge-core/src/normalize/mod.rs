//! Payload Normalizer
//!
//! Turns one raw transport frame into one or more [`CanonicalMessage`]s.
//!
//! ## Pipeline
//!
//! 1. **Decode** ([`decode`]): structured batch, then structured single
//!    (tolerating single quotes), then `sender : body` text
//! 2. **Time** ([`timestamp`]): parse the server timestamp or keep it as a label
//! 3. **Repair** ([`sender`]): split clocks fused onto sender names
//! 4. **Flags**: system and ownership
//!
//! Batches arrive newest-first and are reversed so the output is always
//! oldest-first.
//!
//! # Error Handling
//!
//! Normalization never fails. Missing or malformed fields degrade to
//! defaults, and every frame yields at least one message.

pub mod decode;
pub mod sender;
pub mod timestamp;

use chrono::{DateTime, Utc};

use crate::types::{is_system_sender, CanonicalMessage, SYSTEM_SENDER};

use self::sender::split_trailing_clock;

pub use decode::{DecodedFrame, RawEntry};

/// Normalize a raw frame for `current_username`.
pub fn normalize(raw: &str, current_username: &str) -> Vec<CanonicalMessage> {
    normalize_at(raw, current_username, Utc::now())
}

/// Like [`normalize`], with "now" supplied by the caller.
pub fn normalize_at(
    raw: &str,
    current_username: &str,
    now: DateTime<Utc>,
) -> Vec<CanonicalMessage> {
    match decode::decode(raw) {
        DecodedFrame::Batch(entries) => {
            let mut messages: Vec<CanonicalMessage> = entries
                .into_iter()
                .map(|entry| canonicalize(entry, current_username, now))
                .collect();
            messages.reverse();
            messages
        }
        DecodedFrame::Single(entry) | DecodedFrame::Delimited(entry) => {
            vec![canonicalize(entry, current_username, now)]
        }
    }
}

fn canonicalize(entry: RawEntry, current_username: &str, now: DateTime<Utc>) -> CanonicalMessage {
    let (event_time, mut display_label) =
        timestamp::derive_event_time(entry.time_source.as_deref(), now);

    let mut sender = entry
        .sender
        .unwrap_or_else(|| SYSTEM_SENDER.to_string());
    if let Some((name, clock)) = split_trailing_clock(&sender) {
        sender = name;
        display_label.get_or_insert(clock);
    }

    let is_system = is_system_sender(&sender);
    let is_own = !is_system && sender == current_username;

    CanonicalMessage {
        id: entry
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        sender,
        body: entry.body,
        event_time,
        display_label,
        is_own,
        is_system,
        analysis: entry.analysis,
    }
}
