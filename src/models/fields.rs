//! Lookup helpers for upstream payloads that spell one concept several ways.

use serde_json::Value;

/// Returns the value under the first key in `keys` that holds something usable.
///
/// `null`, empty strings and empty arrays count as absent, so a later synonym
/// key is consulted instead. Non-object records have no keys.
#[must_use]
pub fn first_present<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| is_present(value))
}

/// Like [`first_present`], restricted to non-empty arrays.
#[must_use]
pub fn first_non_empty_array<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a [Value]> {
    let object = record.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_array)
        .find(|items| !items.is_empty())
        .map(Vec::as_slice)
}

/// Like [`first_present`], rendered as text. Numbers are accepted too.
#[must_use]
pub fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    match first_present(record, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Canonical textual form of an episode number.
///
/// Upstream mixes `3`, `3.0` and `"3"` for the same episode, and clients send
/// path segments such as `"03"`. Integral values collapse to their decimal
/// form; other strings are only trimmed.
#[must_use]
pub fn canonical_episode_number(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(canonical_float)
            }
        }
        Value::String(s) => canonical_episode_text(s),
        _ => None,
    }
}

/// [`canonical_episode_number`] for a value that arrived as plain text.
#[must_use]
pub fn canonical_episode_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(i.to_string());
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(canonical_float(f)),
        _ => Some(trimmed.to_string()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn canonical_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}
