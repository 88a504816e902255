//! Lenient JSON extraction from model output.
//!
//! Models wrap JSON in code fences, prepend prose, or answer with a bare
//! array where an object was requested. These helpers recover the payload.

use serde::de::DeserializeOwned;
use serde_json::Value;

use ifrof_core::{Error, Result};

/// Strip a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Byte range of the first balanced `{...}` or `[...]` in `text`.
fn outermost_span(text: &str) -> Option<(usize, usize)> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((start, start + offset + ch.len_utf8()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first JSON value embedded in model output.
pub fn extract_json_value(text: &str) -> Result<Value> {
    let candidate = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    let (start, end) = outermost_span(candidate)
        .ok_or_else(|| Error::Serialization("no JSON object found in model output".to_string()))?;
    Ok(serde_json::from_str(&candidate[start..end])?)
}

/// Extract and decode a JSON object from model output.
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = extract_json_value(text)?;
    Ok(serde_json::from_value(value)?)
}

/// Extract a list that may arrive bare or wrapped as `{"<key>": [...]}`.
///
/// An object without `key` but with exactly one array-valued field is
/// unwrapped as well.
pub fn parse_lenient_list<T: DeserializeOwned>(text: &str, key: &str) -> Result<Vec<T>> {
    let value = extract_json_value(text)?;
    let array = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) => inner,
            None => {
                let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
                match (arrays.next(), arrays.next()) {
                    (Some((_, inner)), None) => inner,
                    _ => {
                        return Err(Error::Serialization(format!(
                            "expected an array or an object with \"{}\"",
                            key
                        )))
                    }
                }
            }
        },
        _ => {
            return Err(Error::Serialization(
                "expected a JSON array or object".to_string(),
            ))
        }
    };
    Ok(serde_json::from_value(array)?)
}
