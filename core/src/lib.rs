//! # Tokenward Core
//!
//! Domain layer for refresh token rotation and JWT handling.
//! This crate contains domain entities, the token services, repository
//! interfaces, and error types. Persistence and secret-store adapters live
//! in `tw_infra`.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::{
    Claims, Principal, PrincipalType, RefreshTokenRecord, RefreshTokenState, TokenPair, TokenType,
    User, UserContext,
};
pub use errors::{AuthError, DomainError, StorageError, TokenError};
pub use repositories::{TokenRepository, UserRepository};
pub use services::{
    hash_token, AlgorithmPolicy, FileKeyManager, JwtCodec, KeyManager, PrincipalDecoder,
    RefreshTokenService, SecretStore, StaticKeyManager, TokenServiceConfig, VaultKeyManager,
};
