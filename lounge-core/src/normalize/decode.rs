//! Frame decoders
//!
//! Each decoder is a pure function from raw frame text to an optional
//! decoded shape. [`decode`] composes them with first-success semantics:
//! structured batch, then structured single, then delimited text (which
//! always succeeds).

use serde_json::{Map, Value};

use crate::types::{SafetyAnalysis, SYSTEM_SENDER};

/// Object keys that carry a batch of entries
const BATCH_KEYS: &[&str] = &["data", "messages", "history"];
/// Accepted spellings of the sender field, in priority order
const SENDER_KEYS: &[&str] = &["userName", "user_name", "username", "user"];
/// Accepted spellings of the body field, in priority order
const BODY_KEYS: &[&str] = &["message", "content", "text"];
/// Accepted spellings of the timestamp field, in priority order
const TIME_KEYS: &[&str] = &["date_time", "timestamp", "time"];
const ANALYSIS_KEY: &str = "analysis";
const DELIMITER: &str = " : ";

/// Fields pulled out of one chat entry, before canonicalization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntry {
    pub id: Option<String>,
    pub sender: Option<String>,
    pub body: String,
    pub time_source: Option<String>,
    pub analysis: Option<SafetyAnalysis>,
}

/// The shape a frame decoded as
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    /// Several entries, in delivery order (newest-first)
    Batch(Vec<RawEntry>),
    /// One structured entry
    Single(RawEntry),
    /// A `sender : body` line, or bare system text
    Delimited(RawEntry),
}

/// Decode a frame, trying each shape in turn.
pub fn decode(raw: &str) -> DecodedFrame {
    decode_batch(raw)
        .or_else(|| decode_single(raw))
        .unwrap_or_else(|| decode_delimited(raw))
}

/// A JSON array, or an object holding a non-empty array under a batch key.
///
/// An object carrying its own sender or body is a single entry, whatever
/// else it holds. The array must contain at least one object or string.
pub fn decode_batch(raw: &str) -> Option<DecodedFrame> {
    let value = parse_relaxed(raw)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) if !is_entry(map) => BATCH_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };
    if !items
        .iter()
        .any(|item| item.is_object() || item.is_string())
    {
        return None;
    }

    Some(DecodedFrame::Batch(items.iter().map(entry_from_item).collect()))
}

/// A single JSON object (single quotes tolerated).
pub fn decode_single(raw: &str) -> Option<DecodedFrame> {
    single_entry(raw).map(DecodedFrame::Single)
}

/// `sender : body`; without a separator the whole frame is system text.
pub fn decode_delimited(raw: &str) -> DecodedFrame {
    DecodedFrame::Delimited(delimited_entry(raw))
}

fn single_entry(raw: &str) -> Option<RawEntry> {
    match parse_relaxed(raw)? {
        Value::Object(map) => Some(entry_from_object(&map, raw)),
        _ => None,
    }
}

fn delimited_entry(raw: &str) -> RawEntry {
    match raw.split_once(DELIMITER) {
        Some((sender, body)) if !sender.trim().is_empty() => RawEntry {
            sender: Some(sender.trim().to_string()),
            body: body.to_string(),
            ..Default::default()
        },
        _ => RawEntry {
            sender: Some(SYSTEM_SENDER.to_string()),
            body: raw.to_string(),
            ..Default::default()
        },
    }
}

/// Parse as JSON, retrying with single quotes swapped for double quotes.
///
/// Only objects and arrays count as structured.
fn parse_relaxed(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    let structured = |value: Value| match value {
        Value::Object(_) | Value::Array(_) => Some(value),
        _ => None,
    };

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => structured(value),
        Err(_) if trimmed.contains('\'') => serde_json::from_str::<Value>(&trimmed.replace('\'', "\""))
            .ok()
            .and_then(structured),
        Err(_) => None,
    }
}

/// True when the object has a sender or body field of its own
fn is_entry(map: &Map<String, Value>) -> bool {
    SENDER_KEYS
        .iter()
        .chain(BODY_KEYS)
        .any(|key| map.contains_key(*key))
}

fn entry_from_item(item: &Value) -> RawEntry {
    match item {
        Value::Object(map) => entry_from_object(map, &item.to_string()),
        Value::String(text) => single_entry(text).unwrap_or_else(|| delimited_entry(text)),
        other => delimited_entry(&other.to_string()),
    }
}

fn entry_from_object(map: &Map<String, Value>, raw: &str) -> RawEntry {
    let body = first_present(map, BODY_KEYS)
        .map(body_text)
        .unwrap_or_else(|| raw.to_string());

    RawEntry {
        id: map.get("id").and_then(scalar_text).filter(|id| !id.trim().is_empty()),
        sender: first_text(map, SENDER_KEYS),
        body,
        time_source: first_text(map, TIME_KEYS),
        analysis: map.get(ANALYSIS_KEY).and_then(analysis_from_value),
    }
}

/// First key whose value is present and non-null
fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// First key holding non-blank scalar text
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(scalar_text))
        .find(|text| !text.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Human-readable body, unwrapping one level of structured payload.
fn body_text(value: &Value) -> String {
    match value {
        Value::String(text) => match parse_relaxed(text) {
            Some(Value::Object(inner)) => inner_body(&inner).unwrap_or_else(|| text.clone()),
            _ => text.clone(),
        },
        Value::Object(inner) => inner_body(inner).unwrap_or_else(|| value.to_string()),
        other => scalar_text(other).unwrap_or_else(|| other.to_string()),
    }
}

fn inner_body(inner: &Map<String, Value>) -> Option<String> {
    first_present(inner, BODY_KEYS).map(|value| match value {
        Value::String(text) => text.clone(),
        other => scalar_text(other).unwrap_or_else(|| other.to_string()),
    })
}

fn analysis_from_value(value: &Value) -> Option<SafetyAnalysis> {
    let parsed;
    let map = match value {
        Value::Object(map) => map,
        Value::String(text) => {
            parsed = parse_relaxed(text)?;
            parsed.as_object()?
        }
        _ => return None,
    };

    let text = |key: &str| map.get(key).and_then(scalar_text);
    let defaults = SafetyAnalysis::default();

    Some(SafetyAnalysis {
        assessment: text("assessment").unwrap_or(defaults.assessment),
        reasoning: text("reasoning").unwrap_or(defaults.reasoning),
        danger_level: text("danger_level")
            .filter(|level| !level.trim().is_empty())
            .unwrap_or(defaults.danger_level),
        model_predictions: map
            .get("model_predictions")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or(defaults.model_predictions),
        risk_score: map
            .get("risk_score")
            .and_then(|score| match score {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .filter(|score: &f64| score.is_finite())
            .unwrap_or(defaults.risk_score),
        grooming_style: text("grooming_style")
            .filter(|style| !style.trim().is_empty())
            .unwrap_or(defaults.grooming_style),
    })
}
