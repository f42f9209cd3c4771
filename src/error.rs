use thiserror::Error;

/// Error types for the multipeak-rs library.
#[derive(Error, Debug)]
pub enum MultiPeakError {
    /// Invalid lineshape, peak count, or builder state at construction time.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Parameter vector or lineshape output does not have the expected size.
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatchError { expected: usize, actual: usize },

    /// The optimizer failed to converge, raised internally, or the fit input was invalid.
    #[error("Fit failed: {0}")]
    FitError(String),

    /// Error indicating a mismatch in vector or matrix dimensions inside the optimizer.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),
}

impl From<crate::parameters::parameter::ParameterError> for MultiPeakError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        MultiPeakError::ParameterError(format!("{}", err))
    }
}

impl From<crate::parameters::bounds::BoundsError> for MultiPeakError {
    fn from(err: crate::parameters::bounds::BoundsError) -> Self {
        MultiPeakError::ParameterError(format!("{}", err))
    }
}

/// Result type alias for multipeak-rs operations.
pub type Result<T> = std::result::Result<T, MultiPeakError>;
