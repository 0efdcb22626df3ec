//! HTTP file generator - renders a test plan in .http format

use crate::descriptor::{RequestDescriptor, TestCase};
use crate::plan::TestPlan;
use crate::template::encode;

/// Generate .http file content from every case of a plan
#[must_use]
pub fn to_http_file(plan: &TestPlan) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "# Auto-generated x-test cases ({} cases, {}/{} routes tested)",
        plan.len(),
        plan.routes_tested,
        plan.total_routes
    ));
    lines.push(String::new());

    for (idx, planned) in plan.cases().enumerate() {
        lines.push(format!("### [{idx}] {}", planned.case.description));
        lines.push(format!("# Operation: {}", planned.operation()));
        push_expectations(&mut lines, planned.case);
        lines.push(request_to_http(&planned.case.request));
        lines.push(String::new());
    }

    lines.join("\n")
}

fn push_expectations(lines: &mut Vec<String>, case: &TestCase) {
    if let Some(status) = case.response.status {
        lines.push(format!("# Expect: {status}"));
    }
    if !case.unused.is_empty() {
        let names: Vec<&str> = case.unused.keys().map(String::as_str).collect();
        lines.push(format!("# Unused: {}", names.join(", ")));
    }
}

/// Generate a single request as .http format
#[must_use]
pub fn request_to_http(request: &RequestDescriptor) -> String {
    let mut lines = vec![format!(
        "{} {}",
        request.method.to_uppercase(),
        url_with_query(request)
    )];

    for (key, value) in request.header_pairs() {
        if !matches!(key.to_lowercase().as_str(), "host" | "content-length") {
            lines.push(format!("{key}: {value}"));
        }
    }

    if let Some(body) = &request.body {
        lines.push(String::new());
        lines.push(serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string()));
    }

    lines.join("\n")
}

/// The request URI with its query string appended.
#[must_use]
pub fn url_with_query(request: &RequestDescriptor) -> String {
    let pairs = request.query_pairs();
    if pairs.is_empty() {
        return request.uri.clone();
    }
    let query: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect();
    format!("{}?{}", request.uri, query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::synthesize_document;
    use crate::variables::Variables;
    use serde_json::json;

    fn plan() -> TestPlan {
        let doc = json!({
            "host": "localhost:8080",
            "paths": {
                "/pets": {
                    "get": {
                        "parameters": [{"name": "tags", "in": "query"}],
                        "x-test": [{
                            "description": "Return dogs/cats",
                            "request": {"parameters": {"tags": ["dogs", "big cats"], "stray": 1}},
                            "response": {"200": {}}
                        }]
                    },
                    "post": {
                        "parameters": [{"name": "pet", "in": "body", "schema": {
                            "type": "object", "properties": {"name": {"type": "string"}}
                        }}],
                        "x-test": [{
                            "request": {
                                "parameters": {"name": "gary"},
                                "headers": {"Authorization": "Bearer token", "Host": "ignored"}
                            },
                            "response": {"201": {}}
                        }]
                    }
                }
            }
        });
        synthesize_document(&doc, &Variables::new()).unwrap()
    }

    #[test]
    fn generates_http_file_header() {
        let output = to_http_file(&plan());
        assert!(output.contains("# Auto-generated x-test cases (2 cases, 2/2 routes tested)"));
    }

    #[test]
    fn generates_request_with_method_and_query() {
        let output = to_http_file(&plan());
        assert!(output.contains("GET http://localhost:8080/pets?tags=dogs&tags=big%20cats"));
        assert!(output.contains("# Operation: GET /pets"));
        assert!(output.contains("# Unused: stray"));
    }

    #[test]
    fn includes_headers_and_body() {
        let output = to_http_file(&plan());
        assert!(output.contains("POST http://localhost:8080/pets"));
        assert!(output.contains("Authorization: Bearer token"));
        assert!(output.contains("content-type: application/json"));
        assert!(!output.contains("Host: ignored"));
        assert!(output.contains("\"name\": \"gary\""));
        assert!(output.contains("# Expect: 201"));
    }

    #[test]
    fn request_to_http_basic() {
        let request = RequestDescriptor {
            method: "get".to_string(),
            uri: "http://localhost/api".to_string(),
            path: None,
            query: None,
            body: None,
            headers: None,
        };

        let output = request_to_http(&request);

        assert!(output.starts_with("GET http://localhost/api"));
        assert!(!output.contains("###"));
    }
}
