//! swaggest-core: test-case synthesis and response validation
//!
//! Turns the `x-test` fixtures of a Swagger 2.x document into request
//! descriptors with expectations, and checks actual responses against them.
//! No network I/O happens here.

pub mod config;
pub mod descriptor;
pub mod dump;
pub mod error;
pub mod fixture;
pub mod generator;
pub mod parameter;
pub mod plan;
pub mod reference;
pub mod report;
pub mod synthesize;
pub mod template;
pub mod validate;
pub mod variables;

pub use config::{Config, ConfigError};
pub use descriptor::{ExpectedResponse, RequestDescriptor, TestCase};
pub use dump::{DumpError, DumpIndex};
pub use error::SynthesisError;
pub use fixture::Fixture;
pub use generator::to_http_file;
pub use parameter::{Location, ParameterDef, ResolvedParameters, resolve_parameters};
pub use plan::{PlannedCase, TestPlan, synthesize_document};
pub use reference::resolve_ref;
pub use report::{CaseResult, CaseStatus, SuiteReport};
pub use synthesize::{OperationRef, Synthesizer};
pub use validate::{ActualResponse, Check, CheckOutcome, ValidationReport, validate};
pub use variables::Variables;
