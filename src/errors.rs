//! Error types for model construction and gate inference.

use thiserror::Error;

/// Failures raised while wiring factors into a model or using a
/// capability a factor or distribution does not have.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FactorError {
    /// A factor references a node the model does not know about.
    #[error("unknown variable: node {0}")]
    UnknownVariable(u64),

    /// A factor references proportions missing from the parameter store.
    #[error("unknown parameter: node {0}")]
    UnknownParameter(u64),

    /// The factor shape has no sufficient-statistics representation.
    #[error("factor class `{0}` has no statistics representation")]
    UnsupportedStatistics(&'static str),

    /// A collapsed update reached proportions that cannot accumulate mass.
    #[error("proportions at node {0} do not accumulate masses")]
    MissingAccumulator(u64),

    #[error("value {value} outside domain of size {domain_size}")]
    ValueOutOfDomain { value: usize, domain_size: usize },

    #[error("invalid proportions: {0}")]
    InvalidProportions(String),

    /// Factor dimensions disagree with the variables it binds.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Outcome of a failed gate inference.
///
/// `NotApplicable` is routine: callers probe many variables and skip those
/// whose neighbourhood does not have the expected shape. `Fatal` means the
/// model itself is inconsistent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference not applicable: {0}")]
    NotApplicable(String),

    #[error("inference failed: {0}")]
    Fatal(String),
}

impl InferenceError {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, InferenceError::NotApplicable(_))
    }
}
