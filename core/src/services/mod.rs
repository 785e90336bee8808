//! Business services containing token logic and use cases.

pub mod token;

// Re-export commonly used types
pub use token::{
    hash_token, AlgorithmPolicy, FileKeyManager, JwtCodec, KeyManager, PrincipalDecoder,
    RefreshTokenService, SecretStore, StaticKeyManager, TokenServiceConfig, VaultKeyManager,
};
