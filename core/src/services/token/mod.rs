//! Token module for JWT and refresh token management
//!
//! This module handles all token-related operations including:
//! - JWT signing and dual-algorithm (RS256/HS256) verification
//! - Key lookup from files, a secret store, or memory
//! - Refresh token rotation, reuse detection and revocation
//! - Decoding bearer tokens into request principals

mod codec;
mod config;
mod decoder;
mod hasher;
mod key_manager;
mod service;

#[cfg(test)]
mod tests;

pub use codec::JwtCodec;
pub use config::{AlgorithmPolicy, TokenServiceConfig};
pub use decoder::PrincipalDecoder;
pub use hasher::hash_token;
pub use key_manager::{
    FileKeyManager, KeyManager, SecretStore, StaticKeyManager, VaultKeyManager, DEFAULT_CACHE_TTL,
    MAX_NEGATIVE_ENTRIES,
};
pub use service::RefreshTokenService;
