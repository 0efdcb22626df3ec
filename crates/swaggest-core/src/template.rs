//! URI template expansion (RFC 6570 simple string expansion)
//!
//! Only `{name}` expressions are expanded; that is all Swagger path
//! templates use. Values are percent-encoded outside the unreserved set.
//! Undefined names and `null` expand to nothing.

use serde_json::{Map, Value};

/// Expand `template` with `values`.
#[must_use]
pub fn fill(template: &str, values: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        out.push_str(literal);
        let Some(close) = tail.find('}') else {
            // unterminated expression: keep verbatim
            out.push_str(tail);
            return out;
        };
        let names = &tail[1..close];
        let expanded: Vec<String> = names
            .split(',')
            .filter_map(|name| values.get(name.trim()).and_then(expand_value))
            .collect();
        out.push_str(&expanded.join(","));
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Whether `template` contains at least one complete `{...}` expression.
#[must_use]
pub fn has_expressions(template: &str) -> bool {
    template
        .find('{')
        .is_some_and(|open| template[open..].contains('}'))
}

fn expand_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(expand_value).collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(k, v)| expand_value(v).map(|v| format!("{},{v}", encode(k))))
                .collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::String(s) => Some(encode(s)),
        Value::Bool(_) | Value::Number(_) => Some(encode(&value.to_string())),
    }
}

pub(crate) fn encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
