//! Suite runner: load, synthesize, execute and validate every x-test case
//!
//! Cases run sequentially in plan order. A transport failure is recorded on
//! its case and the suite carries on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};

use swaggest_core::synthesize::base_url;
use swaggest_core::{
    CaseResult, Config, SuiteReport, SynthesisError, Synthesizer, TestPlan, Variables, validate,
};

use crate::executor::{ExecuteError, HttpExecutor};
use crate::loader::{LoadError, load_document};

/// Runs the `x-test` suite of one document against a server.
pub struct SuiteRunner {
    spec_path: PathBuf,
    host: Option<String>,
    scheme: Option<String>,
    /// Replaces the document-derived base URL entirely
    base_url: Option<String>,
    variables: Variables,
    headers: Map<String, Value>,
    timeout: Duration,
}

impl SuiteRunner {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            spec_path: config.spec.clone(),
            host: config.host.clone(),
            scheme: config.scheme.clone(),
            base_url: None,
            variables: config.variables(),
            headers: config.default_headers(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    #[must_use]
    pub fn with_spec(mut self, spec: Option<PathBuf>) -> Self {
        if let Some(spec) = spec {
            self.spec_path = spec;
        }
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Option<String>) -> Self {
        if host.is_some() {
            self.host = host;
        }
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Overlay extra variables; they win over configured ones.
    #[must_use]
    pub fn with_variables(mut self, extra: Variables) -> Self {
        self.variables = self.variables.merged(extra);
        self
    }

    #[must_use]
    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    /// Load the document and synthesize its plan. No request is sent.
    ///
    /// # Errors
    ///
    /// Unreadable document or synthesis failure.
    pub fn plan(&self) -> Result<TestPlan, RunnerError> {
        let document = load_document(&self.spec_path)?;
        self.plan_document(&document)
    }

    /// Synthesize the plan of an already loaded document.
    ///
    /// # Errors
    ///
    /// Synthesis failure (broken reference, malformed parameter or fixture).
    pub fn plan_document(&self, document: &Value) -> Result<TestPlan, RunnerError> {
        let base = self.base_url.clone().unwrap_or_else(|| {
            base_url(document, self.host.as_deref(), self.scheme.as_deref())
        });
        tracing::debug!(base_url = %base, "synthesizing test plan");
        let plan = Synthesizer::new(document, &self.variables)
            .with_base_url(base)
            .with_default_headers(self.headers.clone())
            .plan()?;
        Ok(plan)
    }

    /// Synthesize, execute and validate the whole suite.
    ///
    /// # Errors
    ///
    /// Plan errors, or the HTTP client failing to build. Per-case transport
    /// errors are part of the report.
    pub fn run(&self) -> Result<SuiteReport, RunnerError> {
        let plan = self.plan()?;
        self.execute(&plan)
    }

    /// Execute and validate every case of `plan`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn execute(&self, plan: &TestPlan) -> Result<SuiteReport, RunnerError> {
        let executor = HttpExecutor::new(self.timeout)?;
        tracing::info!(
            cases = plan.len(),
            routes = plan.total_routes,
            tested = plan.routes_tested,
            "running x-test suite"
        );

        let mut results = Vec::with_capacity(plan.len());
        for planned in plan.cases() {
            let case = planned.case;
            let operation = planned.operation();
            let result = match executor.execute(&case.request) {
                Ok(actual) => CaseResult::validated(
                    operation,
                    case.description.clone(),
                    case.request.clone(),
                    validate(&actual, &case.response),
                ),
                Err(e) => {
                    tracing::warn!(operation = %operation, error = %e, "request failed");
                    CaseResult::errored(
                        operation,
                        case.description.clone(),
                        case.request.clone(),
                        e.to_string(),
                    )
                }
            };
            tracing::info!(
                operation = %result.operation,
                description = %result.description,
                status = %result.status,
                "case finished"
            );
            results.push(result.with_unused(case.unused.keys().cloned().collect()));
        }

        Ok(SuiteReport::new(plan, results))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}
