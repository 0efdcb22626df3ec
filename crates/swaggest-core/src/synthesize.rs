//! Test-case synthesis: fixture + operation → request and expectations

use serde_json::{Map, Value};

use crate::descriptor::{ExpectedResponse, RequestDescriptor, TestCase};
use crate::error::SynthesisError;
use crate::fixture::{EXTENSION_KEY, Fixture};
use crate::parameter::{Location, ResolvedParameters, resolve_parameters};
use crate::reference::deref;
use crate::template;
use crate::variables::Variables;

const CONTENT_TYPE: &str = "content-type";
const JSON_MEDIA_TYPE: &str = "application/json";

/// One (template, method) entry of the document.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    pub template: &'a str,
    pub method: &'a str,
    pub operation: &'a Value,
    /// Path-item level parameters, applied before the operation's own
    pub shared_parameters: &'a [Value],
}

impl OperationRef<'_> {
    /// Label used in logs and errors, e.g. `GET /pets/{id}`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.template)
    }

    /// Shared parameters followed by the operation's own; `None` when
    /// neither level declares a `parameters` list. An empty declared list
    /// is `Some`.
    #[must_use]
    pub fn raw_parameters(&self) -> Option<Vec<Value>> {
        let own = self.operation.get("parameters").and_then(Value::as_array);
        if own.is_none() && self.shared_parameters.is_empty() {
            return None;
        }
        let own = own.map(Vec::as_slice).unwrap_or_default();
        Some(self.shared_parameters.iter().chain(own).cloned().collect())
    }

    /// Raw `x-test` entries; `None` when the operation has none.
    #[must_use]
    pub fn fixtures(&self) -> Option<&Vec<Value>> {
        self.operation.get(EXTENSION_KEY).and_then(Value::as_array)
    }

    /// Declared response schema for `status`, top-level `$ref` resolved.
    ///
    /// # Errors
    ///
    /// Unresolvable response or schema reference.
    pub fn declared_schema(
        &self,
        status: u16,
        document: &Value,
    ) -> Result<Option<Value>, SynthesisError> {
        let Some(response) = self
            .operation
            .get("responses")
            .and_then(|r| r.get(status.to_string()))
        else {
            return Ok(None);
        };
        let response = deref(response, document)?;
        response
            .get("schema")
            .map(|schema| deref(schema, document).cloned())
            .transpose()
    }
}

/// Builds test cases for one document.
///
/// Holds the document, the variable mapping and the base URL; every call
/// produces fresh values and leaves its inputs untouched.
pub struct Synthesizer<'a> {
    pub(crate) document: &'a Value,
    variables: &'a Variables,
    base_url: String,
    default_headers: Map<String, Value>,
}

impl<'a> Synthesizer<'a> {
    #[must_use]
    pub fn new(document: &'a Value, variables: &'a Variables) -> Self {
        Self {
            document,
            variables,
            base_url: base_url(document, None, None),
            default_headers: Map::new(),
        }
    }

    /// Replace the base URL derived from the document (`scheme://host/basePath`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Headers sent with every request. Fixture headers override them.
    #[must_use]
    pub fn with_default_headers(mut self, headers: Map<String, Value>) -> Self {
        self.default_headers = headers;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Synthesize every fixture of one operation, in order.
    ///
    /// # Errors
    ///
    /// Broken references or malformed parameters/fixtures, tagged with the
    /// operation label.
    pub fn synthesize_operation(
        &self,
        op: &OperationRef<'_>,
    ) -> Result<Vec<TestCase>, SynthesisError> {
        let Some(fixtures) = op.fixtures() else {
            return Ok(Vec::new());
        };
        let tag = |e: SynthesisError| e.in_operation(op.method, op.template);

        let params = op
            .raw_parameters()
            .map(|raw| resolve_parameters(&raw, self.document))
            .transpose()
            .map_err(tag)?;
        fixtures
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let fixture: Fixture = serde_json::from_value(raw.clone())
                    .map_err(|source| SynthesisError::MalformedFixture { index, source })
                    .map_err(tag)?;
                self.synthesize(op, params.as_ref(), &fixture).map_err(tag)
            })
            .collect()
    }

    /// Synthesize one fixture against already resolved parameters;
    /// `params` is `None` when the operation declares no parameter list.
    ///
    /// # Errors
    ///
    /// Unresolvable declared response schema.
    pub fn synthesize(
        &self,
        op: &OperationRef<'_>,
        params: Option<&ResolvedParameters>,
        fixture: &Fixture,
    ) -> Result<TestCase, SynthesisError> {
        let buckets = Buckets::classify(
            fixture.parameters(),
            params,
            self.variables,
            template::has_expressions(op.template),
        );
        for key in buckets.invalid.keys() {
            tracing::debug!(operation = %op.label(), parameter = %key, "fixture parameter unused");
        }

        let empty = Map::new();
        let filled = template::fill(op.template, buckets.path.as_ref().unwrap_or(&empty));

        let body = buckets.body.map(Value::Object);
        let headers = self.merge_headers(fixture.headers(), buckets.header, body.is_some());

        let (status, status_fallback) = fixture.expected_status();
        if status_fallback {
            tracing::warn!(
                operation = %op.label(),
                declared = fixture.response.len(),
                "fixture has no single parsable response status, expecting 200"
            );
        }
        let literal = fixture.response_for(status).unwrap_or_default();
        let spec = op.declared_schema(status, self.document)?;

        let description = fixture
            .description
            .clone()
            .unwrap_or_else(|| format!("{} {}", op.method, op.template));
        tracing::debug!(operation = %op.label(), %description, status, "synthesized test case");

        Ok(TestCase {
            description,
            request: RequestDescriptor {
                method: op.method.to_string(),
                uri: format!("{}{filled}", self.base_url),
                path: buckets.path,
                query: buckets.query,
                body,
                headers,
            },
            response: ExpectedResponse {
                status: Some(status),
                headers: literal.headers,
                schema: literal.schema,
                spec,
            },
            unused: buckets.invalid,
            status_fallback,
        })
    }

    /// Defaults, then static fixture headers, then declared header
    /// parameters; later layers win. A body implies a JSON content type
    /// unless one is set.
    fn merge_headers(
        &self,
        fixed: Option<&Map<String, Value>>,
        declared: Option<Map<String, Value>>,
        has_body: bool,
    ) -> Option<Map<String, Value>> {
        let mut headers: Option<Map<String, Value>> =
            (!self.default_headers.is_empty()).then(|| self.default_headers.clone());
        if let Some(fixed) = fixed {
            headers
                .get_or_insert_with(Map::new)
                .extend(fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(declared) = declared {
            headers.get_or_insert_with(Map::new).extend(declared);
        }
        if has_body {
            let headers = headers.get_or_insert_with(Map::new);
            if !headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE))
            {
                headers.insert(CONTENT_TYPE.into(), JSON_MEDIA_TYPE.into());
            }
        }
        headers
    }
}

/// Fixture parameters sorted by destination.
#[derive(Debug, Default)]
struct Buckets {
    path: Option<Map<String, Value>>,
    query: Option<Map<String, Value>>,
    header: Option<Map<String, Value>>,
    body: Option<Map<String, Value>>,
    invalid: Map<String, Value>,
}

impl Buckets {
    /// Substitute and route every fixture parameter.
    ///
    /// Without fixture parameters, or without a declared parameter list to
    /// route them by, every bucket is `None` except `path`, which is `{}`
    /// when the template has expressions to fill. Otherwise `path` is always
    /// present and the other buckets are `None` when empty.
    fn classify(
        given: Option<&Map<String, Value>>,
        params: Option<&ResolvedParameters>,
        variables: &Variables,
        templated: bool,
    ) -> Self {
        let unrouted = Self {
            path: templated.then(Map::new),
            ..Self::default()
        };
        let Some(given) = given else {
            return unrouted;
        };
        let Some(params) = params else {
            return Self {
                invalid: substitute_all(given, variables),
                ..unrouted
            };
        };

        let mut path = Map::new();
        let mut query = Map::new();
        let mut header = Map::new();
        let mut body = Map::new();
        let mut invalid = Map::new();
        for (key, raw) in given {
            let value = variables.substitute(raw);
            let bucket = match params.classify(key) {
                Location::Path => &mut path,
                Location::Query => &mut query,
                Location::Header => &mut header,
                Location::Body => &mut body,
                Location::Invalid => &mut invalid,
            };
            bucket.insert(key.clone(), value);
        }

        Self {
            path: Some(path),
            query: non_empty(query),
            header: non_empty(header),
            body: non_empty(body),
            invalid,
        }
    }
}

fn substitute_all(given: &Map<String, Value>, variables: &Variables) -> Map<String, Value> {
    given
        .iter()
        .map(|(k, v)| (k.clone(), variables.substitute(v)))
        .collect()
}

fn non_empty(map: Map<String, Value>) -> Option<Map<String, Value>> {
    (!map.is_empty()).then_some(map)
}

/// `scheme://host` + `basePath`, without a trailing slash.
///
/// Host defaults to `localhost`, scheme to the first declared `schemes`
/// entry, then `http`.
#[must_use]
pub fn base_url(document: &Value, host: Option<&str>, scheme: Option<&str>) -> String {
    let host = host
        .or_else(|| document.get("host").and_then(Value::as_str))
        .unwrap_or("localhost");
    let scheme = scheme
        .or_else(|| {
            document
                .get("schemes")
                .and_then(Value::as_array)
                .and_then(|s| s.first())
                .and_then(Value::as_str)
        })
        .unwrap_or("http");
    let base_path = document
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or_default();
    format!("{scheme}://{host}{base_path}")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "host": "petstore.swagger.io",
            "basePath": "/api",
            "definitions": {
                "pet": {
                    "type": "object",
                    "required": ["id", "name"],
                    "properties": {
                        "id": {"type": "integer", "format": "int64"},
                        "name": {"type": "string"}
                    }
                },
                "newPet": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "breed": {"type": "object"},
                        "colors": {"type": "array"}
                    }
                }
            },
            "responses": {
                "petResponse": {"description": "a pet", "schema": {"$ref": "#/definitions/pet"}}
            }
        })
    }

    fn op<'a>(template: &'a str, method: &'a str, operation: &'a Value) -> OperationRef<'a> {
        OperationRef {
            template,
            method,
            operation,
            shared_parameters: &[],
        }
    }

    fn run(
        template: &str,
        method: &str,
        operation: Value,
        fixture: Value,
        vars: &Variables,
    ) -> TestCase {
        let doc = document();
        let synth = Synthesizer::new(&doc, vars);
        let op = op(template, method, &operation);
        let params = op
            .raw_parameters()
            .map(|raw| resolve_parameters(&raw, &doc).unwrap());
        let fixture: Fixture = serde_json::from_value(fixture).unwrap();
        synth.synthesize(&op, params.as_ref(), &fixture).unwrap()
    }

    #[test]
    fn get_with_query_parameters() {
        let case = run(
            "/pets",
            "get",
            json!({"parameters": [
                {"name": "tags", "in": "query", "type": "array"},
                {"name": "limit", "in": "query", "type": "integer"}
            ]}),
            json!({
                "description": "Return 50 dogs/cats",
                "request": {"parameters": {"tags": ["dogs", "cats"], "limit": 50}},
                "response": {"200": {}}
            }),
            &Variables::new(),
        );

        assert_eq!(case.description, "Return 50 dogs/cats");
        assert_eq!(case.request.method, "get");
        assert_eq!(case.request.uri, "http://petstore.swagger.io/api/pets");
        assert_eq!(case.request.path, Some(Map::new()));
        assert_eq!(
            case.request.query,
            json!({"tags": ["dogs", "cats"], "limit": 50}).as_object().cloned()
        );
        assert_eq!(case.request.body, None);
        assert_eq!(case.request.headers, None);
        assert_eq!(case.response.status, Some(200));
        assert!(!case.status_fallback);
    }

    #[test]
    fn delete_with_path_parameter() {
        let case = run(
            "/pets/{id}",
            "delete",
            json!({"parameters": [{"name": "id", "in": "path", "required": true}]}),
            json!({"request": {"parameters": {"id": 101}}, "response": {"204": {}}}),
            &Variables::new(),
        );
        assert!(case.request.uri.ends_with("/pets/101"));
        assert_eq!(case.response.status, Some(204));
        assert_eq!(case.description, "delete /pets/{id}");
    }

    #[test]
    fn header_parameter_substituted() {
        let mut vars = Variables::new();
        vars.insert("token", "himom");
        let case = run(
            "/pets/feed",
            "get",
            json!({"parameters": [
                {"name": "id", "in": "header"},
                {"name": "token", "in": "header"}
            ]}),
            json!({
                "request": {
                    "parameters": {"id": 101, "token": "$token"},
                    "headers": {"content-type": "application/json"}
                },
                "response": {"200": {}}
            }),
            &vars,
        );
        let headers = case.request.headers.unwrap();
        assert_eq!(headers["token"], "himom");
        assert_eq!(headers["id"], 101);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(case.request.query, None);
    }

    #[test]
    fn declared_header_beats_static_header() {
        let case = run(
            "/pets/feed",
            "get",
            json!({"parameters": [{"name": "id", "in": "header"}]}),
            json!({
                "request": {"parameters": {"id": 2}, "headers": {"id": 1}},
                "response": {"200": {}}
            }),
            &Variables::new(),
        );
        assert_eq!(case.request.headers.unwrap()["id"], 2);
    }

    #[test]
    fn missing_variable_passes_literal() {
        let case = run(
            "/pets",
            "get",
            json!({"parameters": [{"name": "q", "in": "query"}]}),
            json!({"request": {"parameters": {"q": "$missing"}}, "response": {"200": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.query.unwrap()["q"], "$missing");
    }

    #[test]
    fn flattened_body_fields_with_default_content_type() {
        let case = run(
            "/pets",
            "post",
            json!({
                "parameters": [{"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/newPet"}}],
                "responses": {"200": {"$ref": "#/responses/petResponse"}}
            }),
            json!({
                "description": "Add a new pet",
                "request": {"parameters": {
                    "name": "garythesnail",
                    "breed": {"primary": "lab", "secondary": "poodle"},
                    "colors": ["pink", "red", "blue"],
                    "owner": "nobody"
                }},
                "response": {"200": {
                    "headers": {"content-type": "application/json"},
                    "schema": {"message": "SUCCESS"}
                }}
            }),
            &Variables::new(),
        );

        assert_eq!(
            case.request.body,
            Some(json!({
                "name": "garythesnail",
                "breed": {"primary": "lab", "secondary": "poodle"},
                "colors": ["pink", "red", "blue"]
            }))
        );
        assert_eq!(case.request.path, Some(Map::new()));
        assert_eq!(case.request.query, None);
        assert_eq!(
            case.request.headers.unwrap()["content-type"],
            "application/json"
        );
        assert_eq!(case.unused["owner"], "nobody");

        assert_eq!(case.response.schema, Some(json!({"message": "SUCCESS"})));
        assert_eq!(
            case.response.headers.unwrap()["content-type"],
            "application/json"
        );
        let spec = case.response.spec.unwrap();
        assert_eq!(spec["required"], json!(["id", "name"]));
    }

    #[test]
    fn explicit_content_type_kept() {
        let case = run(
            "/pets",
            "post",
            json!({"parameters": [{"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/newPet"}}]}),
            json!({
                "request": {
                    "parameters": {"name": "x"},
                    "headers": {"Content-Type": "application/merge-patch+json"}
                },
                "response": {"200": {}}
            }),
            &Variables::new(),
        );
        let headers = case.request.headers.unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Content-Type"], "application/merge-patch+json");
    }

    #[test]
    fn no_fixture_parameters_yields_null_buckets() {
        let case = run(
            "/pets",
            "get",
            json!({"parameters": [{"name": "limit", "in": "query"}]}),
            json!({"description": "Return E V E R Y T H I N G", "response": {"200": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.path, None);
        assert_eq!(case.request.query, None);
        assert_eq!(case.request.body, None);
        assert_eq!(case.request.headers, None);
        assert_eq!(case.request.uri, "http://petstore.swagger.io/api/pets");
    }

    #[test]
    fn undeclared_operation_parameters_all_unused() {
        let case = run(
            "/pets",
            "get",
            json!({}),
            json!({"request": {"parameters": {"limit": 5}}, "response": {"200": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.path, None);
        assert_eq!(case.request.query, None);
        assert_eq!(case.unused["limit"], 5);
    }

    #[test]
    fn ambiguous_status_flagged() {
        let case = run(
            "/pets",
            "get",
            json!({}),
            json!({"response": {"200": {}, "404": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.response.status, Some(200));
        assert!(case.status_fallback);
    }

    #[test]
    fn spec_attached_only_when_declared() {
        let case = run(
            "/pets/{id}",
            "delete",
            json!({"responses": {"204": {"description": "deleted"}}}),
            json!({"response": {"204": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.response.spec, None);
        assert_eq!(case.response.schema, None);
        assert_eq!(case.response.headers, None);
    }

    #[test]
    fn default_headers_layered_under_fixture() {
        let doc = document();
        let vars = Variables::new();
        let defaults = json!({"authorization": "Bearer abc", "accept": "*/*"});
        let synth = Synthesizer::new(&doc, &vars)
            .with_default_headers(defaults.as_object().cloned().unwrap());
        let operation = json!({});
        let op = op("/pets", "get", &operation);
        let fixture: Fixture = serde_json::from_value(json!({
            "request": {"headers": {"accept": "application/json"}},
            "response": {"200": {}}
        }))
        .unwrap();
        let case = synth.synthesize(&op, None, &fixture).unwrap();
        let headers = case.request.headers.unwrap();
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["accept"], "application/json");
    }

    #[test]
    fn synthesize_operation_tags_errors() {
        let doc = document();
        let vars = Variables::new();
        let synth = Synthesizer::new(&doc, &vars);
        let operation = json!({
            "parameters": [{"$ref": "#/parameters/nope"}],
            "x-test": [{"response": {"200": {}}}]
        });
        let err = synth
            .synthesize_operation(&op("/pets", "get", &operation))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GET /pets: unresolved reference #/parameters/nope: no 'parameters' in document"
        );
    }

    #[test]
    fn synthesize_operation_rejects_malformed_fixture() {
        let doc = document();
        let vars = Variables::new();
        let synth = Synthesizer::new(&doc, &vars);
        let operation = json!({"x-test": [{"response": {"200": {}}}, {"description": 5}]});
        let err = synth
            .synthesize_operation(&op("/pets", "get", &operation))
            .unwrap_err();
        match err {
            SynthesisError::Operation { source, .. } => {
                assert!(matches!(*source, SynthesisError::MalformedFixture { index: 1, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_response_headers_reject_fixture() {
        let doc = document();
        let vars = Variables::new();
        let synth = Synthesizer::new(&doc, &vars);
        let operation = json!({"x-test": [{"response": {"200": {
            "headers": "application/json",
            "schema": {"message": "SUCCESS"}
        }}}]});
        let err = synth
            .synthesize_operation(&op("/pets", "get", &operation))
            .unwrap_err();
        match err {
            SynthesisError::Operation { source, .. } => {
                assert!(matches!(*source, SynthesisError::MalformedFixture { index: 0, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn operation_without_fixtures_is_empty() {
        let doc = document();
        let vars = Variables::new();
        let synth = Synthesizer::new(&doc, &vars);
        let operation = json!({"parameters": [{"$ref": "#/parameters/nope"}]});
        let cases = synth
            .synthesize_operation(&op("/pets", "get", &operation))
            .unwrap();
        assert!(cases.is_empty());
    }

    #[test]
    fn shared_parameters_come_first() {
        let shared = vec![json!({"name": "id", "in": "query"})];
        let operation = json!({"parameters": [{"name": "id", "in": "path"}]});
        let op = OperationRef {
            template: "/pets/{id}",
            method: "get",
            operation: &operation,
            shared_parameters: &shared,
        };
        let params = resolve_parameters(&op.raw_parameters().unwrap(), &document()).unwrap();
        assert_eq!(params.classify("id"), Location::Path);
    }

    #[test]
    fn templated_route_without_fixture_parameters_has_empty_path() {
        let case = run(
            "/pets/{id}",
            "delete",
            json!({"parameters": [{"name": "id", "in": "path"}]}),
            json!({"response": {"204": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.path, Some(Map::new()));
        assert_eq!(case.request.query, None);
        assert_eq!(case.request.body, None);
        assert_eq!(case.request.uri, "http://petstore.swagger.io/api/pets/");
    }

    #[test]
    fn templated_route_without_declared_parameters_has_empty_path() {
        let case = run(
            "/pets/{id}",
            "get",
            json!({}),
            json!({"request": {"parameters": {"id": 1}}, "response": {"200": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.path, Some(Map::new()));
        assert_eq!(case.request.query, None);
        assert_eq!(case.unused["id"], 1);
    }

    #[test]
    fn empty_declared_parameter_list_still_routes() {
        let case = run(
            "/pets",
            "get",
            json!({"parameters": []}),
            json!({"request": {"parameters": {"extra": 1}}, "response": {"200": {}}}),
            &Variables::new(),
        );
        assert_eq!(case.request.path, Some(Map::new()));
        assert_eq!(case.request.query, None);
        assert_eq!(case.request.body, None);
        assert_eq!(case.request.headers, None);
        assert_eq!(case.unused["extra"], 1);
    }

    #[test]
    fn raw_parameters_distinguishes_absent_from_empty() {
        let none = json!({});
        assert!(op("/pets", "get", &none).raw_parameters().is_none());
        let empty = json!({"parameters": []});
        assert_eq!(op("/pets", "get", &empty).raw_parameters(), Some(Vec::new()));
    }

    #[test]
    fn base_url_defaults_and_overrides() {
        assert_eq!(base_url(&json!({}), None, None), "http://localhost");
        assert_eq!(
            base_url(&json!({"host": "api.io", "basePath": "/v1/", "schemes": ["https"]}), None, None),
            "https://api.io/v1"
        );
        assert_eq!(
            base_url(&json!({"host": "api.io"}), Some("127.0.0.1:8080"), Some("http")),
            "http://127.0.0.1:8080"
        );
    }
}
