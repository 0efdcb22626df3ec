//! `$ref` resolution against the root document
//!
//! References are local pointers of the form `#/definitions/pet` or
//! `#/parameters/limit`: the `#/` prefix is stripped, the rest is split on `/`
//! and walked from the document root. A missing segment is an error, never a
//! silent default.

use serde_json::Value;

use crate::error::SynthesisError;

/// Chained references (`$ref` pointing at another `$ref`) are followed at
/// most this many times.
const MAX_REF_DEPTH: u32 = 20;

/// Look up a reference string in `document`.
///
/// # Errors
///
/// `InvalidReference` if the string is not a local pointer,
/// `UnresolvedReference` if any segment is missing.
pub fn resolve_ref<'a>(reference: &str, document: &'a Value) -> Result<&'a Value, SynthesisError> {
    let pointer = reference
        .strip_prefix("#/")
        .ok_or_else(|| SynthesisError::InvalidReference(reference.to_string()))?;

    let mut node = document;
    for raw in pointer.split('/') {
        let segment = unescape(raw);
        let next = match node {
            Value::Object(map) => map.get(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        node = next.ok_or_else(|| SynthesisError::UnresolvedReference {
            reference: reference.to_string(),
            segment: segment.clone(),
        })?;
    }
    Ok(node)
}

/// The `$ref` string of a reference object, if `node` is one.
#[must_use]
pub fn ref_target(node: &Value) -> Option<&str> {
    node.get("$ref").and_then(Value::as_str)
}

/// Dereference `node` if it is a reference object, following chains.
/// Non-reference nodes come back unchanged.
///
/// Only the top level is dereferenced: a schema whose `items` or
/// `properties` hold references keeps them as-is.
///
/// # Errors
///
/// Propagates lookup errors; `ReferenceCycle` when the chain does not end.
pub fn deref<'a>(node: &'a Value, document: &'a Value) -> Result<&'a Value, SynthesisError> {
    let mut current = node;
    for _ in 0..MAX_REF_DEPTH {
        match ref_target(current) {
            Some(reference) => current = resolve_ref(reference, document)?,
            None => return Ok(current),
        }
    }
    Err(SynthesisError::ReferenceCycle(
        ref_target(node).unwrap_or_default().to_string(),
    ))
}

// JSON pointer escapes: ~1 is '/', ~0 is '~'
fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
