//! Parameter resolution: raw `parameters` list → name-keyed definitions

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SynthesisError;
use crate::reference::{deref, ref_target};

/// Reserved key of the body parameter. Body parameters may carry any name.
pub const BODY_KEY: &str = "body";

/// Where a value travels in the request.
///
/// `Invalid` covers both declared locations the engine does not route
/// (`formData`, a fixture key naming the body parameter itself) and fixture
/// keys that match nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Path,
    Query,
    Header,
    Body,
    Invalid,
}

impl Location {
    /// Parse a parameter's `in` attribute.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "path" => Self::Path,
            "query" => Self::Query,
            "header" => Self::Header,
            "body" => Self::Body,
            _ => Self::Invalid,
        }
    }
}

/// A concrete (dereferenced) parameter definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub location: Location,
    /// Dereferenced schema. For body parameters any top-level `$ref` is
    /// already resolved.
    pub schema: Option<Value>,
}

impl ParameterDef {
    /// Whether this is an object-typed body whose `properties` declare `key`.
    fn declares_body_property(&self, key: &str) -> bool {
        self.schema.as_ref().is_some_and(|schema| {
            schema.get("type").and_then(Value::as_str) == Some("object")
                && schema
                    .get("properties")
                    .and_then(Value::as_object)
                    .is_some_and(|props| props.contains_key(key))
        })
    }
}

/// Name → definition map of one operation, body parameter under [`BODY_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParameters {
    params: BTreeMap<String, ParameterDef>,
}

impl ResolvedParameters {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.params.get(name)
    }

    /// The body parameter, if the operation declares one.
    #[must_use]
    pub fn body(&self) -> Option<&ParameterDef> {
        self.params.get(BODY_KEY)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Route one fixture key.
    ///
    /// Declared parameters route by their `in`; a declared body parameter is
    /// never a routing target by name. Undeclared keys go to the body when it
    /// is an object declaring that property, otherwise nowhere.
    #[must_use]
    pub fn classify(&self, key: &str) -> Location {
        if let Some(param) = self.params.get(key) {
            return match param.location {
                Location::Path | Location::Query | Location::Header => param.location,
                Location::Body | Location::Invalid => Location::Invalid,
            };
        }
        if self
            .body()
            .is_some_and(|body| body.declares_body_property(key))
        {
            return Location::Body;
        }
        Location::Invalid
    }
}

/// Resolve a raw parameter list against `document`.
///
/// Later entries override earlier ones on name collision; of several body
/// parameters the last one wins.
///
/// # Errors
///
/// Any unresolvable `$ref` (parameter or body schema), or a non-body
/// parameter without a name.
pub fn resolve_parameters(
    raw: &[Value],
    document: &Value,
) -> Result<ResolvedParameters, SynthesisError> {
    let mut params = BTreeMap::new();
    for (index, entry) in raw.iter().enumerate() {
        let (key, def) = resolve_entry(index, entry, document)?;
        params.insert(key, def);
    }
    Ok(ResolvedParameters { params })
}

fn resolve_entry(
    index: usize,
    entry: &Value,
    document: &Value,
) -> Result<(String, ParameterDef), SynthesisError> {
    let entry = if entry.get("in").is_none() && ref_target(entry).is_some() {
        deref(entry, document)?
    } else {
        entry
    };

    let location = entry
        .get("in")
        .and_then(Value::as_str)
        .map_or(Location::Invalid, Location::parse);
    let name = entry.get("name").and_then(Value::as_str);

    if location == Location::Body {
        let schema = entry
            .get("schema")
            .map(|schema| deref(schema, document).cloned())
            .transpose()?;
        let def = ParameterDef {
            name: name.unwrap_or(BODY_KEY).to_string(),
            location,
            schema,
        };
        return Ok((BODY_KEY.to_string(), def));
    }

    let name = name.ok_or(SynthesisError::MalformedParameter { index })?;
    let def = ParameterDef {
        name: name.to_string(),
        location,
        schema: entry.get("schema").cloned(),
    };
    Ok((name.to_string(), def))
}
