//! Error types for stack synthesis

use thiserror::Error;

use crate::domain::{LogicalIdError, NetworkError, ValidationError};

/// Errors that can occur while assembling a stack
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Invalid or contradictory configuration flags
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A logical id or parameter path failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Two resources were declared under the same logical id
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// CIDR or subnet derivation error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The assembled graph broke a stack invariant
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Reading a context file failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for stack synthesis
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

impl From<LogicalIdError> for InfrastructureError {
    fn from(err: LogicalIdError) -> Self {
        InfrastructureError::InvalidIdentifier(err.to_string())
    }
}

impl From<serde_json::Error> for InfrastructureError {
    fn from(err: serde_json::Error) -> Self {
        InfrastructureError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for InfrastructureError {
    fn from(err: std::io::Error) -> Self {
        InfrastructureError::Io(err.to_string())
    }
}
