//! Sender repair
//!
//! Some upstream senders glue a clock onto the username without a separator
//! (`frosti03:29`). The trailing clock is split off so the sender shows up
//! clean and the clock can still be displayed.

use std::sync::OnceLock;

use regex::Regex;

fn trailing_clock() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?) ?([0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?)$").expect("trailing clock pattern is valid")
    })
}

/// Split `name03:29` into `("name", "03:29")`.
///
/// Returns `None` when there is no trailing clock or nothing but whitespace
/// precedes it.
pub fn split_trailing_clock(sender: &str) -> Option<(String, String)> {
    let captures = trailing_clock().captures(sender)?;
    let prefix = captures.get(1)?.as_str().trim();
    if prefix.is_empty() {
        return None;
    }
    Some((prefix.to_string(), captures.get(2)?.as_str().to_string()))
}
