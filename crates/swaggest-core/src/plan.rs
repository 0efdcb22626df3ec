//! Document-level synthesis: the grouped test plan

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::TestCase;
use crate::error::SynthesisError;
use crate::synthesize::{OperationRef, Synthesizer};
use crate::variables::Variables;

/// Path-item keys that name operations. Anything else on a path item
/// (`parameters`, vendor extensions) is not one.
pub const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Template → method → ordered test cases
pub type Routes = BTreeMap<String, BTreeMap<String, Vec<TestCase>>>;

/// Every test case of a document, grouped by route and method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestPlan {
    pub routes: Routes,
    /// Operations in the document
    pub total_routes: usize,
    /// Operations carrying an `x-test` list
    pub routes_tested: usize,
}

/// A test case with its route coordinates, as yielded by [`TestPlan::cases`].
#[derive(Debug, Clone, Copy)]
pub struct PlannedCase<'a> {
    pub template: &'a str,
    pub method: &'a str,
    pub case: &'a TestCase,
}

impl PlannedCase<'_> {
    /// `GET /pets/{id}`
    #[must_use]
    pub fn operation(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.template)
    }
}

impl TestPlan {
    /// All cases in route, then method, then fixture order.
    pub fn cases(&self) -> impl Iterator<Item = PlannedCase<'_>> {
        self.routes.iter().flat_map(|(template, methods)| {
            methods.iter().flat_map(move |(method, cases)| {
                cases.iter().map(move |case| PlannedCase {
                    template,
                    method,
                    case,
                })
            })
        })
    }

    /// The flat presentation of the same cases.
    #[must_use]
    pub fn flatten(&self) -> Vec<&TestCase> {
        self.cases().map(|planned| planned.case).collect()
    }

    /// Number of test cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable listing of the plan, one line per case.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        for planned in self.cases() {
            let case = planned.case;
            let request = &case.request;
            lines.push(format!(
                "{} - {}",
                planned.operation(),
                case.description
            ));
            lines.push(format!(
                "  {} {}",
                request.method.to_uppercase(),
                request.uri
            ));
            if let Some(status) = case.response.status {
                let note = if case.status_fallback { " (default)" } else { "" };
                lines.push(format!("  expect {status}{note}"));
            }
            if !case.unused.is_empty() {
                let names: Vec<&str> = case.unused.keys().map(String::as_str).collect();
                lines.push(format!("  unused parameters: {}", names.join(", ")));
            }
        }

        let untested: Vec<String> = self
            .routes
            .iter()
            .flat_map(|(template, methods)| {
                methods
                    .iter()
                    .filter(|(_, cases)| cases.is_empty())
                    .map(move |(method, _)| format!("{} {template}", method.to_uppercase()))
            })
            .collect();
        if !untested.is_empty() {
            lines.push(String::new());
            lines.push(format!("Without cases: {}", untested.join(", ")));
        }

        lines.push(String::new());
        lines.push(format!(
            "Routes: {} total, {} tested; {} cases",
            self.total_routes,
            self.routes_tested,
            self.len()
        ));
        lines.join("\n")
    }
}

impl Synthesizer<'_> {
    /// Synthesize every operation of the document.
    ///
    /// # Errors
    ///
    /// The first operation that fails to synthesize aborts the plan.
    pub fn plan(&self) -> Result<TestPlan, SynthesisError> {
        let mut plan = TestPlan::default();
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Ok(plan);
        };

        for (template, item) in paths {
            let shared = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let methods = plan.routes.entry(template.clone()).or_default();

            for &method in METHODS {
                let Some(operation) = item.get(method) else {
                    continue;
                };
                let op = OperationRef {
                    template,
                    method,
                    operation,
                    shared_parameters: shared,
                };
                plan.total_routes += 1;
                if op.fixtures().is_some() {
                    plan.routes_tested += 1;
                }
                methods.insert(method.to_string(), self.synthesize_operation(&op)?);
            }
        }

        tracing::info!(
            routes = plan.total_routes,
            tested = plan.routes_tested,
            cases = plan.len(),
            "test plan synthesized"
        );
        Ok(plan)
    }
}

/// Synthesize the grouped plan of `document` with the document's own base URL.
///
/// # Errors
///
/// See [`Synthesizer::plan`].
pub fn synthesize_document(
    document: &Value,
    variables: &Variables,
) -> Result<TestPlan, SynthesisError> {
    Synthesizer::new(document, variables).plan()
}
