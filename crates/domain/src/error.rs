//! Unified error types for the domain layer
//!
//! Provides a common error type that can be used across all domain operations,
//! enabling consistent error handling without forcing adapters to use String or anyhow.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Content is configured in a way the player cannot resolve
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Parse error (for value objects and JSON metadata)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A consumable (paint, experience) does not cover the request
    #[error("Insufficient {resource}: have {available}, need {required}")]
    Insufficient {
        resource: &'static str,
        available: f64,
        required: f64,
    },
}

impl DomainError {
    /// Creates a validation error for malformed input.
    ///
    /// # Example
    /// ```ignore
    /// if steps.is_empty() {
    ///     return Err(DomainError::validation("story has no steps"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Creates a parse error for malformed wire values or JSON configuration.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    /// Create an insufficient resource error
    pub fn insufficient(resource: &'static str, available: f64, required: f64) -> Self {
        Self::Insufficient {
            resource,
            available,
            required,
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
