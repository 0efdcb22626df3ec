//! Synthesis output: request and expected-response descriptors

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fully formed request, ready for the HTTP client.
///
/// `path`, `query` and `body` serialize as `null` when empty so that an
/// absent payload stays distinguishable from an explicitly empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequestDescriptor {
    /// Lower-case method as declared in the document
    pub method: String,
    /// Fully qualified, template-filled URI
    pub uri: String,
    pub path: Option<Map<String, Value>>,
    pub query: Option<Map<String, Value>>,
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
}

impl RequestDescriptor {
    /// Query parameters as text pairs; arrays repeat the key.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for (key, value) in query {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|item| (key.clone(), value_to_text(item))));
                }
                Value::Null => {}
                other => pairs.push((key.clone(), value_to_text(other))),
            }
        }
        pairs
    }

    /// Headers as text pairs.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), value_to_text(v)))
            .collect()
    }
}

/// Strings as-is, anything else as JSON text.
#[must_use]
pub fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// What a response must look like. Every field gates one check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpectedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Subset of response headers that must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    /// Literal fixture payload, subset-compared against the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Declared response schema, used for type and required-field checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
}

/// One synthesized test: request plus expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    pub description: String,
    pub request: RequestDescriptor,
    pub response: ExpectedResponse,
    /// Fixture parameters that matched no declared location. Never sent.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub unused: Map<String, Value>,
    /// The expected status is the 200 default because the fixture declared
    /// zero or several statuses, or one that does not parse.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub status_fallback: bool,
}
