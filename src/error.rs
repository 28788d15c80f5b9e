use thiserror::Error;

/// Result alias for the crate
pub type Result<T> = std::result::Result<T, UmapError>;

/// Errors returned by the estimator, the datasets and the metrics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UmapError {
    /// A parameter is out of range or could not be parsed
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Input matrix or label vector was empty
    #[error("input data is empty")]
    EmptyInput,

    /// Number of features does not match the fitted model
    #[error("dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Two inputs that must be aligned row by row have different lengths
    #[error("length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Input contains NaN or infinite values
    #[error("input contains non-finite values at row {row}, column {col}")]
    NonFiniteInput { row: usize, col: usize },

    /// `transform` or an accessor was called before `fit`
    #[error("model has not been fitted yet; call `fit` first")]
    NotFitted,
}

impl UmapError {
    /// Shorthand for an [`UmapError::InvalidParameter`]
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        UmapError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
