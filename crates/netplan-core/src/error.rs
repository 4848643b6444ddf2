//! Unified error types for the netplan data model.
//!
//! Domain-specific error types in downstream crates convert to [`CoreError`]
//! for uniform handling at API boundaries.

use thiserror::Error;

/// Unified error type for netplan data-model operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Data validation errors (shape mismatches, contradictory inputs)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}
