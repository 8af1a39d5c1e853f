//! Line-oriented `key = value` files, as written by Ghostty.
//!
//! A key may repeat: repeated keys load as a list, a key seen once loads as
//! a plain string, and a list saves back as one line per item. Values are
//! kept as text.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{data::target::value_to_text, error::CodecError};

/// Split a `key = value` line. Comments, blank lines and lines without a key
/// are not entries.
fn entry(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

pub(super) fn parse(content: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in content.lines().filter_map(entry) {
        let value = Value::String(value.to_string());
        match map.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Render `map`, reusing the comments, blank lines and key order of
/// `previous`. Keys missing from `map` are dropped; new keys go last.
pub(super) fn render(
    map: &Map<String, Value>,
    previous: Option<&str>,
) -> Result<String, CodecError> {
    let mut out = Vec::new();
    let mut written = HashSet::new();

    for line in previous.unwrap_or("").lines() {
        match entry(line) {
            None => out.push(line.to_string()),
            Some((key, _)) => {
                let Some(value) = map.get(key) else { continue };
                if written.insert(key.to_string()) {
                    push_lines(&mut out, key, value)?;
                }
            }
        }
    }
    for (key, value) in map {
        if !written.contains(key.as_str()) {
            push_lines(&mut out, key, value)?;
        }
    }

    let mut s = out.join("\n");
    s.push('\n');
    Ok(s)
}

fn push_lines(out: &mut Vec<String>, key: &str, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                push_lines(out, key, item)?;
            }
        }
        Value::Object(_) => {
            return Err(
                format!("'{key}' holds a table, which a key = value file cannot store").into(),
            );
        }
        scalar => out.push(format!("{key} = {}", value_to_text(scalar))),
    }
    Ok(())
}
