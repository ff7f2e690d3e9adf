//! Error types for Teahouse.

use thiserror::Error;

/// Common error type for Teahouse.
///
/// The first six variants form the authentication and authorization
/// taxonomy. They are raised by the session, permission and gate layers and
/// travel unchanged up to the HTTP surface.
#[derive(Error, Debug)]
pub enum TeahouseError {
    /// Missing, unknown or expired session token.
    #[error("authentication required")]
    Unauthenticated,

    /// Valid session without the required capability, or an elevation rule
    /// violation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bad username/password pair. Never says which half was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Structurally disallowed request.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Backing store unavailable or a write failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unknown capability name.
    #[error("invalid capability: {0}")]
    InvalidCapability(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniqueness conflict (duplicate username, email, title, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for TeahouseError {
    fn from(e: sqlx::Error) -> Self {
        TeahouseError::Storage(e.to_string())
    }
}

/// Result type alias for Teahouse operations.
pub type Result<T> = std::result::Result<T, TeahouseError>;
