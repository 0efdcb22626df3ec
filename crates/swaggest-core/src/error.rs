//! Synthesis errors

/// Failure to turn a fixture into a test case.
///
/// Every variant points at a malformed document: a broken reference or a
/// parameter/fixture that does not have the shape the engine relies on.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("unresolved reference {reference}: no '{segment}' in document")]
    UnresolvedReference { reference: String, segment: String },

    #[error("reference {0} is not a local '#/' pointer")]
    InvalidReference(String),

    #[error("reference {0} does not terminate (cycle or chain too deep)")]
    ReferenceCycle(String),

    #[error("parameter #{index} has no name")]
    MalformedParameter { index: usize },

    #[error("fixture #{index} is malformed: {source}")]
    MalformedFixture {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<SynthesisError>,
    },
}

impl SynthesisError {
    /// Attach the operation label (`GET /pets`) to an error.
    #[must_use]
    pub fn in_operation(self, method: &str, template: &str) -> Self {
        Self::Operation {
            operation: format!("{} {template}", method.to_uppercase()),
            source: Box::new(self),
        }
    }
}
