//! Error types for Argos core
//!
//! Explicit error variants with context, using thiserror.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid component ID: {id}, reason: {reason}")]
    InvalidComponentId { id: String, reason: String },

    #[error("Invalid endpoint: {endpoint}, reason: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}
