//! Visible transcript assembly
//!
//! The transcript is the ordered list of messages a renderer shows:
//! normalized server frames interleaved with synthetic system entries.

use crate::normalize::normalize;
use crate::types::CanonicalMessage;

/// Ordered chat transcript
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<CanonicalMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw frame and append the result.
    ///
    /// Returns the newly appended messages.
    pub fn ingest_frame(&mut self, raw: &str, current_username: &str) -> &[CanonicalMessage] {
        let start = self.messages.len();
        self.messages.extend(normalize(raw, current_username));
        &self.messages[start..]
    }

    /// Append a synthetic system entry.
    pub fn push_system(&mut self, body: impl Into<String>) -> &CanonicalMessage {
        self.messages.push(CanonicalMessage::system(body));
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[CanonicalMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
