// src/response.rs
//! Tolerant extraction of JSON from text-generator output.
//!
//! Generators asked for "JSON only" still wrap it in prose or markdown fences.
//! Stages, first success wins:
//! 1) the whole (trimmed) string
//! 2) the interior of the first fenced block (```` ``` ```` / ```` ```json ````)
//! 3) the first balanced `{…}` or `[…]` region that parses (string literals respected)
//!
//! `parse_object` runs the same stages but only accepts a JSON object.
//!
//! `None` means total failure; callers substitute their own default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*(?i:json)?[ \t]*\r?\n?(.*?)```").expect("fence regex"));

pub fn parse_response(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    if let Some(v) = fenced_json(trimmed) {
        return Some(v);
    }

    first_balanced_json(trimmed, b"{[")
}

/// Like `parse_response`, but only a JSON object counts; arrays anywhere in the
/// reply are passed over in favour of the first parseable `{…}`.
pub fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(m)) = serde_json::from_str::<Value>(trimmed) {
        return Some(m);
    }

    if let Some(Value::Object(m)) = fenced_json(trimmed) {
        return Some(m);
    }

    match first_balanced_json(trimmed, b"{")? {
        Value::Object(m) => Some(m),
        _ => None,
    }
}

/// `parse_response` followed by typed deserialization; `None` on shape mismatch too.
pub fn parse_as<T: DeserializeOwned>(raw: &str) -> Option<T> {
    parse_response(raw).and_then(|v| serde_json::from_value(v).ok())
}

fn fenced_json(s: &str) -> Option<Value> {
    let inner = FENCED_BLOCK.captures(s)?.get(1)?;
    serde_json::from_str(inner.as_str().trim()).ok()
}

/// First balanced region opened by one of `opens` that parses.
///
/// Regions nested inside one that already failed are not retried, so the parse
/// work stays linear in the input.
fn first_balanced_json(s: &str, opens: &[u8]) -> Option<Value> {
    let bytes = s.as_bytes();
    let mut failed_until: Option<usize> = None;
    for (open, close) in balanced_spans(bytes) {
        if !opens.contains(&bytes[open]) || failed_until.is_some_and(|end| close <= end) {
            continue;
        }
        match serde_json::from_str::<Value>(&s[open..=close]) {
            Ok(v) => return Some(v),
            Err(_) => failed_until = Some(close),
        }
    }
    None
}

/// Every balanced `{…}` / `[…]` pair as `(open, close)` byte offsets, sorted by
/// `open`. Single pass. Quotes only start a string literal inside a bracket, and
/// a mismatched close drops every pending open.
/// Brackets and quotes are ASCII, so byte scanning is UTF-8 safe.
fn balanced_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut stack: Vec<(usize, u8)> = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if !stack.is_empty() => in_string = true,
            b'{' => stack.push((i, b'}')),
            b'[' => stack.push((i, b']')),
            b'}' | b']' => match stack.pop() {
                Some((open, close)) if close == b => spans.push((open, i)),
                Some(_) => stack.clear(),
                None => {}
            },
            _ => {}
        }
    }
    spans.sort_unstable_by_key(|&(open, _)| open);
    spans
}
