//! Plain-text transcript rendering.

use lounge_core::format::message_time;
use lounge_core::{CanonicalMessage, SafetyAnalysis, Transcript};

/// One transcript entry as a terminal line.
pub fn render_line(msg: &CanonicalMessage) -> String {
    if msg.is_system {
        return format!("*** {}", msg.body);
    }

    let marker = if msg.is_own { " (you)" } else { "" };
    let mut line = format!(
        "[{}] {}{}: {}",
        message_time(msg),
        msg.sender,
        marker,
        msg.body
    );
    if let Some(analysis) = &msg.analysis {
        line.push(' ');
        line.push_str(&analysis_summary(analysis));
    }
    line
}

pub fn analysis_summary(analysis: &SafetyAnalysis) -> String {
    format!(
        "[danger: {}, risk {:.2}]",
        analysis.danger_level, analysis.risk_score
    )
}

/// Print every entry after the first `shown`; returns the new count.
pub fn print_since(transcript: &Transcript, shown: usize) -> usize {
    for msg in transcript.messages().iter().skip(shown) {
        println!("{}", render_line(msg));
    }
    transcript.len()
}
