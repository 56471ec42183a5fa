//! Error types for csvload
//!
//! Every failure site produces one of four kinds. The loader dispatches on
//! the variant to decide between aborting the run, failing a single file,
//! or retrying the attempt.

use thiserror::Error;

/// Result type alias for csvload operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Closed set of load failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Required settings are missing or invalid. Aborts the whole run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source file is unreadable, empty or structurally malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Dataset was read but is structurally unsound.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection, transaction or write failure that may succeed on retry.
    #[error("{0}")]
    Transient(String),
}

impl LoadError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a parse error from any displayable cause
    pub fn parse(cause: impl std::fmt::Display) -> Self {
        Self::Parse(cause.to_string())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transient error from any displayable cause
    pub fn transient(cause: impl std::fmt::Display) -> Self {
        Self::Transient(cause.to_string())
    }

    /// Whether another attempt with a fresh connection may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
