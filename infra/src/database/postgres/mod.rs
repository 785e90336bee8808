//! PostgreSQL repository implementations

pub mod token_repository_impl;
pub mod user_repository_impl;

pub use token_repository_impl::PostgresTokenRepository;
pub use user_repository_impl::PostgresUserRepository;

use tw_core::errors::DomainError;

/// Wrap a driver error with the operation that failed
pub(crate) fn db_error(operation: &str, e: sqlx::Error) -> DomainError {
    tracing::error!(error = %e, "Database operation failed: {}", operation);
    DomainError::Internal {
        message: format!("Failed to {}: {}", operation, e),
    }
}
