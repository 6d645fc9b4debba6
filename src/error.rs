use thiserror::Error;

/// Problems with the feature vectors handed to the engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    /// A vector does not have the same length as the first vector.
    #[error("point {index} has {actual} features, expected {expected}")]
    DimensionMismatch {
        /// Position of the offending point in the input
        index: usize,
        /// Length of the first vector
        expected: usize,
        /// Length of the offending vector
        actual: usize,
    },

    /// A feature value is NaN or infinite.
    #[error("point {index} has a non-finite value at feature {feature}")]
    NonFiniteFeature {
        /// Position of the offending point in the input
        index: usize,
        /// Feature position within the vector
        feature: usize,
    },
}

/// Errors returned by the t-SNE engine.
///
/// Numerical degeneracies (underflowing kernel sums, vanishing affinity
/// denominators, unconverged bandwidth searches) are absorbed and never show
/// up here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TsneError {
    /// The input vectors are not usable.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// A parameter is outside its valid range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value (as f64 for display)
        value: f64,
        /// What the parameter has to satisfy
        reason: &'static str,
    },
}

/// Result alias for the crate.
pub type TsneResult<T> = Result<T, TsneError>;

impl TsneError {
    /// Returns `true` for errors caused by the input vectors.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TsneError::InvalidInput(_))
    }
}
