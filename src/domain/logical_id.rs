// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Id Value Object
//!
//! Every declared resource and output is keyed by a logical id. The
//! provisioning engine only accepts ASCII alphanumerics, so the rules are
//! enforced at construction rather than at apply time.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Logical id validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicalIdError {
    #[error("Logical id is empty")]
    Empty,

    #[error("Logical id exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in logical id {id:?}: {ch}")]
    InvalidCharacter { id: String, ch: char },
}

/// Template-unique resource identifier
///
/// Invariants:
/// - Non-empty
/// - At most 255 characters
/// - ASCII alphanumeric only
///
/// # Examples
///
/// ```rust
/// use twin_stack::domain::LogicalId;
///
/// let id = LogicalId::new("SwaggerALB").unwrap();
/// assert_eq!(id.as_str(), "SwaggerALB");
///
/// assert!(LogicalId::new("").is_err());
/// assert!(LogicalId::new("Swagger-ALB").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum length accepted by the provisioning engine
    pub const MAX_LENGTH: usize = 255;

    /// Create a new logical id with validation
    pub fn new(id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(LogicalIdError::TooLong(id.len()));
        }

        if let Some(ch) = id.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(LogicalIdError::InvalidCharacter { id, ch });
        }

        Ok(Self(id))
    }

    /// Build an id from arbitrary text by dropping separators and
    /// capitalising each word, e.g. `/infra/storage/config-bucket` becomes
    /// `InfraStorageConfigBucket`
    pub fn from_words(prefix: &str, text: &str) -> Result<Self, LogicalIdError> {
        let mut id = String::from(prefix);
        for word in text.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                id.push(first.to_ascii_uppercase());
                id.extend(chars);
            }
        }
        Self::new(id)
    }

    /// Derive a child id by appending a suffix
    pub fn child(&self, suffix: &str) -> Result<Self, LogicalIdError> {
        Self::new(format!("{}{}", self.0, suffix))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(value: LogicalId) -> Self {
        value.0
    }
}
