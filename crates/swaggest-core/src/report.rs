//! Suite results: per-case outcomes and the run summary

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::descriptor::RequestDescriptor;
use crate::plan::TestPlan;
use crate::validate::{CheckOutcome, ValidationReport};

/// Final state of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    /// The request never produced a response (transport error)
    Errored,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::Errored => write!(f, "ERROR"),
        }
    }
}

/// Outcome of executing and validating one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaseResult {
    /// Operation label, e.g. "GET /pets/{id}"
    pub operation: String,
    pub description: String,
    pub status: CaseStatus,
    pub request: RequestDescriptor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fixture parameters that were not sent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unused: Vec<String>,
}

impl CaseResult {
    #[must_use]
    pub fn validated(
        operation: String,
        description: String,
        request: RequestDescriptor,
        report: ValidationReport,
    ) -> Self {
        let status = if report.passed() {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        Self {
            operation,
            description,
            status,
            request,
            checks: report.outcomes,
            error: None,
            unused: Vec::new(),
        }
    }

    #[must_use]
    pub fn errored(
        operation: String,
        description: String,
        request: RequestDescriptor,
        error: String,
    ) -> Self {
        Self {
            operation,
            description,
            status: CaseStatus::Errored,
            request,
            checks: Vec::new(),
            error: Some(error),
            unused: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_unused(mut self, unused: Vec<String>) -> Self {
        self.unused = unused;
        self
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuiteReport {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub errored: u64,
    /// Operations in the document
    pub routes: u64,
    /// Operations with at least an `x-test` list
    pub routes_tested: u64,
    pub cases: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn new(plan: &TestPlan, cases: Vec<CaseResult>) -> Self {
        let count = |status: CaseStatus| {
            u64::try_from(cases.iter().filter(|c| c.status == status).count()).unwrap_or(u64::MAX)
        };
        Self {
            total: u64::try_from(cases.len()).unwrap_or(u64::MAX),
            passed: count(CaseStatus::Passed),
            failed: count(CaseStatus::Failed),
            errored: count(CaseStatus::Errored),
            routes: u64::try_from(plan.total_routes).unwrap_or(u64::MAX),
            routes_tested: u64::try_from(plan.routes_tested).unwrap_or(u64::MAX),
            cases,
        }
    }

    /// 0 every case passed, 1 some case failed, 3 transport errors only or
    /// nothing ran.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.total == 0 {
            3
        } else if self.failed > 0 {
            1
        } else if self.errored > 0 {
            3
        } else {
            0
        }
    }

    /// Human-readable summary for the terminal.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        for case in &self.cases {
            lines.push(format!(
                "[{}] {} - {}",
                case.status, case.operation, case.description
            ));
            for check in case.checks.iter().filter(|c| !c.passed()) {
                lines.push(format!("       {} ({})", check.check, check.comparison));
                for mismatch in &check.mismatches {
                    lines.push(format!("         {mismatch}"));
                }
            }
            if let Some(error) = &case.error {
                lines.push(format!("       {error}"));
            }
            if !case.unused.is_empty() {
                lines.push(format!("       unused parameters: {}", case.unused.join(", ")));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Routes: {} total, {} tested",
            self.routes, self.routes_tested
        ));
        lines.push(format!(
            "Cases:  {} total, {} passed, {} failed, {} errored",
            self.total, self.passed, self.failed, self.errored
        ));
        lines.join("\n")
    }
}

/// JSON Schema of [`SuiteReport`].
///
/// # Errors
///
/// Schema serialization failure.
pub fn generate_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(SuiteReport);
    serde_json::to_string_pretty(&schema)
}
