//! Validation errors for model types.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a model value breaks its invariants.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid interval [{start}, {end}]: end must be greater than start")]
    InvalidInterval { start: f64, end: f64 },

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Unknown emotion category: {0}")]
    UnknownCategory(String),

    #[error("Unknown color style: {0}")]
    UnknownStyle(String),
}
