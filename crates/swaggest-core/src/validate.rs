//! Response validation: actual response vs expected descriptor
//!
//! Pure data, no I/O. Each check runs only when its expected field is
//! present, always runs to completion, and reports every mismatch it finds
//! rather than stopping at the first.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::ExpectedResponse;

/// A materialized HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActualResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Decoded body; `None` when the response had none
    #[serde(default)]
    pub data: Option<Value>,
}

/// The independent checks, one assertion each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Status,
    Headers,
    Values,
    Types,
    Required,
}

impl Check {
    /// The comparison this check asserts.
    #[must_use]
    pub const fn comparison(self) -> &'static str {
        match self {
            Self::Status => "actual.status == expected.status",
            Self::Headers => "actual.headers[k] == expected.headers[k]",
            Self::Values => "actual.data[k] == expected.schema[k]",
            Self::Types => "typeof actual.data[k] == expected.spec.properties[k].type",
            Self::Required => "actual.data[k] is defined for k in expected.spec.required",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Status => "status",
            Self::Headers => "headers",
            Self::Values => "values",
            Self::Types => "types",
            Self::Required => "required",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Both sides present, values differ
    NotEqual,
    /// Expected key absent from the actual response
    MissingKey,
    /// Value of the wrong coarse type
    WrongType,
    /// Required field absent
    MissingRequired,
}

/// One failed comparison inside a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Mismatch {
    pub kind: MismatchKind,
    /// Where, e.g. `status`, `headers.content-type`, `data.stuff.inception`
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.location, self.expected, self.actual
        )
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CheckOutcome {
    pub check: Check,
    pub comparison: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
}

impl CheckOutcome {
    fn new(check: Check, mismatches: Vec<Mismatch>) -> Self {
        Self {
            check,
            comparison: check.comparison().to_string(),
            mismatches,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcomes of every check that ran, in check order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl ValidationReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    #[must_use]
    pub fn outcome(&self, check: Check) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }
}

/// Run every check `expected` enables against `actual`.
#[must_use]
pub fn validate(actual: &ActualResponse, expected: &ExpectedResponse) -> ValidationReport {
    let mut outcomes = Vec::new();
    let null = Value::Null;
    let data = actual.data.as_ref().unwrap_or(&null);

    if let Some(status) = expected.status {
        outcomes.push(CheckOutcome::new(
            Check::Status,
            check_status(actual.status, status),
        ));
    }
    if let Some(headers) = &expected.headers {
        outcomes.push(CheckOutcome::new(
            Check::Headers,
            check_headers(&actual.headers, headers),
        ));
    }
    if let Some(literal) = &expected.schema {
        let mut mismatches = Vec::new();
        check_values(data, literal, "data", &mut mismatches);
        outcomes.push(CheckOutcome::new(Check::Values, mismatches));
    }
    if let Some(spec) = &expected.spec {
        let mut mismatches = Vec::new();
        check_types(data, spec, "data", &mut mismatches);
        outcomes.push(CheckOutcome::new(Check::Types, mismatches));

        let mut mismatches = Vec::new();
        check_required(data, spec, "data", &mut mismatches);
        outcomes.push(CheckOutcome::new(Check::Required, mismatches));
    }

    ValidationReport { outcomes }
}

fn check_status(actual: Option<u16>, expected: u16) -> Vec<Mismatch> {
    if actual == Some(expected) {
        return Vec::new();
    }
    vec![Mismatch {
        kind: MismatchKind::NotEqual,
        location: "status".into(),
        expected: expected.to_string(),
        actual: actual.map_or_else(|| ABSENT.to_string(), |s| s.to_string()),
    }]
}

/// Subset match; names compare case-insensitively when no exact key exists.
fn check_headers(actual: &Map<String, Value>, expected: &Map<String, Value>) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    for (name, want) in expected {
        let got = actual.get(name).or_else(|| {
            actual
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        });
        match got {
            Some(got) if header_equal(got, want) => {}
            Some(got) => mismatches.push(Mismatch {
                kind: MismatchKind::NotEqual,
                location: format!("headers.{name}"),
                expected: render(want),
                actual: render(got),
            }),
            None => mismatches.push(Mismatch {
                kind: MismatchKind::MissingKey,
                location: format!("headers.{name}"),
                expected: render(want),
                actual: ABSENT.into(),
            }),
        }
    }
    mismatches
}

// Header values arrive as text; a numeric or boolean fixture value matches
// its textual form.
fn header_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::Number(_) | Value::Bool(_)) => *a == expected.to_string(),
        _ => values_equal(actual, expected),
    }
}

/// Recursive subset comparison: keys of `expected` only.
fn check_values(actual: &Value, expected: &Value, location: &str, out: &mut Vec<Mismatch>) {
    match (actual, expected) {
        (Value::Object(got), Value::Object(want)) => {
            for (key, want) in want {
                let here = format!("{location}.{key}");
                match got.get(key) {
                    Some(got) => check_values(got, want, &here, out),
                    None => out.push(missing(here, want)),
                }
            }
        }
        (Value::Array(got), Value::Array(want)) => {
            for (index, want) in want.iter().enumerate() {
                let here = format!("{location}[{index}]");
                match got.get(index) {
                    Some(got) => check_values(got, want, &here, out),
                    None => out.push(missing(here, want)),
                }
            }
        }
        _ if values_equal(actual, expected) => {}
        _ => out.push(Mismatch {
            kind: MismatchKind::NotEqual,
            location: location.to_string(),
            expected: render(expected),
            actual: render(actual),
        }),
    }
}

/// Recursive type conformance, driven by `properties` (and `items`).
/// Absent properties are skipped; presence is the required check's job.
fn check_types(actual: &Value, schema: &Value, location: &str, out: &mut Vec<Mismatch>) {
    if !schema.is_object() {
        return;
    }
    if let Some(declared) = schema.get("type").and_then(Value::as_str) {
        if let Some(false) = conforms(actual, declared) {
            out.push(Mismatch {
                kind: MismatchKind::WrongType,
                location: location.to_string(),
                expected: declared.to_string(),
                actual: kind_of(actual).to_string(),
            });
        }
    }

    if let (Some(props), Value::Object(got)) = (
        schema.get("properties").and_then(Value::as_object),
        actual,
    ) {
        for (key, sub) in props {
            if let Some(value) = got.get(key) {
                check_types(value, sub, &format!("{location}.{key}"), out);
            }
        }
    }
    if let (Some(items), Value::Array(got)) = (schema.get("items"), actual) {
        for (index, value) in got.iter().enumerate() {
            check_types(value, items, &format!("{location}[{index}]"), out);
        }
    }
}

/// Recursive required-field check. An absent branch is walked as `{}` so
/// missing leaves below it are still reported.
fn check_required(actual: &Value, schema: &Value, location: &str, out: &mut Vec<Mismatch>) {
    let fields = actual.as_object();
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if fields.and_then(|f| f.get(name)).is_none() {
                out.push(Mismatch {
                    kind: MismatchKind::MissingRequired,
                    location: format!("{location}.{name}"),
                    expected: "defined".into(),
                    actual: ABSENT.into(),
                });
            }
        }
    }

    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    let empty = Value::Object(Map::new());
    for (key, sub) in props {
        let child = fields.and_then(|f| f.get(key)).unwrap_or(&empty);
        check_required(child, sub, &format!("{location}.{key}"), out);
    }
}

/// `None` when the declared type is not one the check knows.
fn conforms(value: &Value, declared: &str) -> Option<bool> {
    let ok = match declared {
        "integer" => is_whole_number(value),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => return None,
    };
    Some(ok)
}

fn is_whole_number(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON equality where `10` and `10.0` are the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        _ => a == b,
    }
}

const ABSENT: &str = "<absent>";

fn missing(location: String, expected: &Value) -> Mismatch {
    Mismatch {
        kind: MismatchKind::MissingKey,
        location,
        expected: render(expected),
        actual: ABSENT.into(),
    }
}

fn render(value: &Value) -> String {
    value.to_string()
}
