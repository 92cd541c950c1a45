//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Row not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The backend rejected or failed an operation.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// A row could not be read into or written from its domain shape.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backend could not be reached.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn http(message: impl ToString) -> Self {
        Self::Http(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
