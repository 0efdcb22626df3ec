//! swaggest-runner: loads documents, sends synthesized requests, validates

pub mod executor;
pub mod loader;
pub mod suite;

pub use executor::{ExecuteError, HttpExecutor};
pub use loader::{LoadError, load_document, parse_document};
pub use suite::{RunnerError, SuiteRunner};
