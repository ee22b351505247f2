use thiserror::Error;
use volwatch_core::InputError;

/// Errors surfaced by detector construction and updates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// A configured value violates its documented domain
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Posterior evidence collapsed; the run-length distribution is undefined
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Input contract violation from the return transform
    #[error("Missing input: {0}")]
    MissingInput(#[from] InputError),
}

impl DetectorError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        DetectorError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type DetectorResult<T> = std::result::Result<T, DetectorError>;
