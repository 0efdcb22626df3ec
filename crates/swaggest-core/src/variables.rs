//! `$name` substitution in fixture parameter values

use std::collections::HashMap;

use serde_json::Value;

/// Marks a fixture string as a variable reference.
pub const SENTINEL: char = '$';

/// Flat name → value mapping consulted for `$name` literals.
///
/// Passed explicitly to the synthesizer; [`Variables::from_env`] builds one
/// from the process environment for callers that want that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    values: HashMap<String, Value>,
}

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment, every value a string.
    /// Entries that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, Value::String(v.into_string().ok()?))))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Overlay `other` on top of `self`; `other` wins on collision.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.values.extend(other.values);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute one fixture value.
    ///
    /// Only strings starting with [`SENTINEL`] are candidates. A known name is
    /// replaced by its value (of any type); an unknown one passes through
    /// verbatim, sentinel included.
    #[must_use]
    pub fn substitute(&self, value: &Value) -> Value {
        value
            .as_str()
            .and_then(|s| s.strip_prefix(SENTINEL))
            .and_then(|name| self.values.get(name))
            .unwrap_or(value)
            .clone()
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, String>> for Variables {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn vars() -> Variables {
        let mut v = Variables::new();
        v.insert("token", "himom");
        v.insert("limit", 50);
        v
    }

    #[test]
    fn known_variable_replaced() {
        assert_eq!(vars().substitute(&json!("$token")), json!("himom"));
    }

    #[test]
    fn replacement_keeps_value_type() {
        assert_eq!(vars().substitute(&json!("$limit")), json!(50));
    }

    #[test]
    fn unknown_variable_passes_through() {
        assert_eq!(vars().substitute(&json!("$missing")), json!("$missing"));
    }

    #[test]
    fn sentinel_only_at_start() {
        assert_eq!(vars().substitute(&json!("a$token")), json!("a$token"));
    }

    #[test]
    fn non_strings_untouched() {
        let v = vars();
        assert_eq!(v.substitute(&json!(101)), json!(101));
        assert_eq!(v.substitute(&json!(["$token"])), json!(["$token"]));
        assert_eq!(v.substitute(&json!({"t": "$token"})), json!({"t": "$token"}));
    }

    #[test]
    fn bare_sentinel_looks_up_empty_name() {
        let mut v = Variables::new();
        assert_eq!(v.substitute(&json!("$")), json!("$"));
        v.insert("", "blank");
        assert_eq!(v.substitute(&json!("$")), json!("blank"));
    }

    #[test]
    fn merged_prefers_overlay() {
        let mut base = Variables::new();
        base.insert("token", "env");
        base.insert("host", "localhost");
        let merged = base.merged(vars());
        assert_eq!(merged.get("token"), Some(&json!("himom")));
        assert_eq!(merged.get("host"), Some(&json!("localhost")));
    }

    #[test]
    fn from_string_map() {
        let map: HashMap<String, String> = [("token".to_string(), "abc".to_string())].into();
        let v = Variables::from(map);
        assert_eq!(v.substitute(&json!("$token")), json!("abc"));
    }

    proptest! {
        #[test]
        fn absent_names_are_idempotent(name in "[a-z_]{1,12}") {
            let v = Variables::new();
            let literal = json!(format!("${name}"));
            let once = v.substitute(&literal);
            prop_assert_eq!(&once, &literal);
            prop_assert_eq!(v.substitute(&once), literal);
        }
    }
}
