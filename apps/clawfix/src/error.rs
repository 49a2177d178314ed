//! Error types for ClawFix
//!
//! A single error enum covers storage, transport, validation and script
//! composition failures. Augmenter failures have their own type
//! (`AugmentError`) because they never leave the augmenter.

use thiserror::Error;

/// Main error type for ClawFix operations
#[derive(Error, Debug)]
pub enum ClawfixError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Entity not found errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input validation errors (malformed or incomplete snapshot)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Script composition errors
    #[error("Compose error: {0}")]
    Compose(String),

    /// Mutex lock errors
    #[error("Lock error: {0}")]
    Lock(String),

    /// General errors with a message
    #[error("{0}")]
    General(String),
}

impl ClawfixError {
    /// Create a not found error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a composition error
    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }

    /// Create a lock error
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }

    /// Whether the caller sent bad input (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }
}

/// Convert String errors to ClawfixError
impl From<String> for ClawfixError {
    fn from(s: String) -> Self {
        Self::General(s)
    }
}

/// Convert &str errors to ClawfixError
impl From<&str> for ClawfixError {
    fn from(s: &str) -> Self {
        Self::General(s.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClawfixError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

/// Result type alias using ClawfixError
pub type Result<T> = std::result::Result<T, ClawfixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ClawfixError::not_found("Diagnosis", "abc123def456");
        assert_eq!(err.to_string(), "Diagnosis not found: abc123def456");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_error() {
        let err = ClawfixError::validation("missing system object");
        assert_eq!(err.to_string(), "Validation error: missing system object");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_compose_error_is_server_side() {
        let err = ClawfixError::compose("extra fix contains NUL");
        assert_eq!(err.to_string(), "Compose error: extra fix contains NUL");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_string_to_error_conversion() {
        let err: ClawfixError = "Something went wrong".into();
        assert_eq!(err.to_string(), "Something went wrong");
    }
}
