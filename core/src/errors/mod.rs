//! Domain-specific error types and error handling.

mod types;


// Re-export all error types and utilities
pub use types::{AuthError, StorageError, TokenError};

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Shorthand for the one error every refresh/decoding failure collapses to
    pub fn authentication_required() -> Self {
        DomainError::Auth(AuthError::AuthenticationRequired)
    }

    /// Whether the caller should be asked to sign in again
    ///
    /// Version conflicts count: a lost rotation race means the token was
    /// already used.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            DomainError::Auth(_)
                | DomainError::Token(_)
                | DomainError::Storage(StorageError::Conflict { .. })
        )
    }

    /// Whether this is an optimistic-concurrency version conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Storage(StorageError::Conflict { .. }))
    }
}
