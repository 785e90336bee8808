//! Shared configuration and response types for the Tokenward workspace
//!
//! This crate provides common functionality used across the server modules:
//! - Configuration types for JWT signing, key stores, database and logging
//! - The error response structure handed to the outer transport layer

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, Environment,
    AuthConfig, JwtConfig, KeyStoreConfig, KeyStoreProvider, VaultConfig,
    DatabaseConfig, LoggingConfig, LogFormat,
};
pub use errors::{ErrorResponse, IntoErrorResponse, error_codes};
