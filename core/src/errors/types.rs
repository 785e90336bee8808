//! Error definitions for authentication, token handling and persistence
//!
//! Caller-facing messages are deliberately uniform: an authentication
//! failure never says whether the token was unknown, expired, reused or
//! malformed.

use thiserror::Error;
use tw_shared::errors::{error_codes, ErrorResponse, IntoErrorResponse};
use uuid::Uuid;

use super::DomainError;

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,
}

/// Token encoding/verification errors
///
/// These stay inside the core; the refresh service and the principal
/// decoder map every one of them to `AuthError::AuthenticationRequired`.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("No valid key available for key id {key_id}")]
    NoValidKey { key_id: String },

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("Failed to load key: {message}")]
    KeyLoad { message: String },
}

/// Token store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Integrity violation: {message}")]
    Integrity { message: String },

    #[error("Version conflict on record {id}")]
    Conflict { id: Uuid },
}

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        if self.is_authentication_failure() {
            return ErrorResponse::new(
                error_codes::AUTHENTICATION_REQUIRED,
                "Please sign in again",
            );
        }

        match self {
            DomainError::Validation { message } => {
                ErrorResponse::new(error_codes::VALIDATION_ERROR, message.clone())
            }
            _ => ErrorResponse::new(error_codes::INTERNAL_ERROR, "Internal server error"),
        }
    }
}
