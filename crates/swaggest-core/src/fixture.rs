//! `x-test` fixture shape

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vendor extension key holding an operation's fixtures.
pub const EXTENSION_KEY: &str = "x-test";

/// One declarative test attached to an operation.
///
/// ```json
/// {
///   "description": "Return a pet",
///   "request": {"parameters": {"id": 101}, "headers": {"accept": "application/json"}},
///   "response": {"200": {"headers": {"content-type": "application/json"}, "schema": {"id": 101}}}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub request: Option<FixtureRequest>,
    /// Status string → expected literal response
    #[serde(default)]
    pub response: BTreeMap<String, FixtureResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureRequest {
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
    /// Static headers, sent as given
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
}

/// Literal expectations for one status of a fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureResponse {
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub schema: Option<Value>,
}

impl Fixture {
    #[must_use]
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        self.request.as_ref().and_then(|r| r.parameters.as_ref())
    }

    #[must_use]
    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.request.as_ref().and_then(|r| r.headers.as_ref())
    }

    /// The expected status and whether it came from the 200 fallback.
    ///
    /// Exactly one response key is parsed like an integer literal (leading
    /// digits); zero keys, several keys, or an unparsable key yield 200.
    #[must_use]
    pub fn expected_status(&self) -> (u16, bool) {
        let mut keys = self.response.keys();
        match (keys.next(), keys.next()) {
            (Some(key), None) => parse_status(key).map_or((DEFAULT_STATUS, true), |s| (s, false)),
            _ => (DEFAULT_STATUS, true),
        }
    }

    /// Literal expectations for `status`.
    ///
    /// Uses the single declared entry when there is one, otherwise the entry
    /// keyed by the status text.
    #[must_use]
    pub fn response_for(&self, status: u16) -> Option<FixtureResponse> {
        let entry = if self.response.len() == 1 {
            self.response.values().next()
        } else {
            self.response.get(&status.to_string())
        }?;
        Some(entry.clone())
    }
}

const DEFAULT_STATUS: u16 = 200;

fn parse_status(key: &str) -> Option<u16> {
    let trimmed = key.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);
    digits.parse::<u16>().ok().filter(|&status| status != 0)
}
