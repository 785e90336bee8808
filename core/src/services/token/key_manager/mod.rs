//! Key lookup by key id for JWT signing and verification
//!
//! Every lookup returns `Ok(None)` when the key simply does not exist for
//! that key id, and an error only when a key exists but cannot be loaded.

mod file;
mod vault;

pub use file::FileKeyManager;
pub use vault::{SecretStore, VaultKeyManager, DEFAULT_CACHE_TTL, MAX_NEGATIVE_ENTRIES};

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::errors::{DomainError, TokenError};

/// Source of signing and verification keys, addressed by key id
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// RSA private key used to sign RS256 tokens
    async fn private_key(&self, key_id: &str) -> Result<Option<EncodingKey>, DomainError>;

    /// RSA public key used to verify RS256 tokens
    async fn public_key(&self, key_id: &str) -> Result<Option<DecodingKey>, DomainError>;

    /// Shared secret used to sign and verify HS256 tokens
    async fn secret(&self, key_id: &str) -> Result<Option<Vec<u8>>, DomainError>;

    /// Whether the backing store can currently be reached
    async fn is_available(&self) -> bool;
}

/// Key ids come from unverified token headers and end up in file paths and
/// secret paths, so only a conservative character set is accepted.
pub(crate) fn is_valid_key_id(key_id: &str) -> bool {
    !key_id.is_empty()
        && key_id.len() <= 128
        && key_id != "."
        && key_id != ".."
        && key_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub(crate) fn parse_private_pem(key_id: &str, pem: &[u8]) -> Result<EncodingKey, DomainError> {
    EncodingKey::from_rsa_pem(pem).map_err(|e| {
        DomainError::Token(TokenError::KeyLoad {
            message: format!("Invalid private key format for {}: {}", key_id, e),
        })
    })
}

pub(crate) fn parse_public_pem(key_id: &str, pem: &[u8]) -> Result<DecodingKey, DomainError> {
    DecodingKey::from_rsa_pem(pem).map_err(|e| {
        DomainError::Token(TokenError::KeyLoad {
            message: format!("Invalid public key format for {}: {}", key_id, e),
        })
    })
}

#[derive(Clone, Default)]
struct StaticKeySet {
    private_key: Option<EncodingKey>,
    public_key: Option<DecodingKey>,
    secret: Option<Vec<u8>>,
}

/// In-memory key set (useful for testing or embedded keys)
#[derive(Clone, Default)]
pub struct StaticKeyManager {
    keys: HashMap<String, StaticKeySet>,
}

impl std::fmt::Debug for StaticKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyManager")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StaticKeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an RSA key pair from PEM strings
    ///
    /// # Returns
    ///
    /// * `Ok(StaticKeyManager)` - Keys parsed successfully
    /// * `Err(DomainError)` - Invalid key format
    pub fn with_rsa_pem(
        mut self,
        key_id: &str,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<Self, DomainError> {
        let entry = self.keys.entry(key_id.to_string()).or_default();
        entry.private_key = Some(parse_private_pem(key_id, private_key_pem.as_bytes())?);
        entry.public_key = Some(parse_public_pem(key_id, public_key_pem.as_bytes())?);
        Ok(self)
    }

    /// Adds only a public key, for verify-only deployments
    pub fn with_public_pem(mut self, key_id: &str, public_key_pem: &str) -> Result<Self, DomainError> {
        let entry = self.keys.entry(key_id.to_string()).or_default();
        entry.public_key = Some(parse_public_pem(key_id, public_key_pem.as_bytes())?);
        Ok(self)
    }

    /// Adds an HS256 shared secret
    pub fn with_secret(mut self, key_id: &str, secret: impl Into<Vec<u8>>) -> Self {
        let entry = self.keys.entry(key_id.to_string()).or_default();
        entry.secret = Some(secret.into());
        self
    }
}

#[async_trait]
impl KeyManager for StaticKeyManager {
    async fn private_key(&self, key_id: &str) -> Result<Option<EncodingKey>, DomainError> {
        Ok(self.keys.get(key_id).and_then(|k| k.private_key.clone()))
    }

    async fn public_key(&self, key_id: &str) -> Result<Option<DecodingKey>, DomainError> {
        Ok(self.keys.get(key_id).and_then(|k| k.public_key.clone()))
    }

    async fn secret(&self, key_id: &str) -> Result<Option<Vec<u8>>, DomainError> {
        Ok(self.keys.get(key_id).and_then(|k| k.secret.clone()))
    }

    async fn is_available(&self) -> bool {
        true
    }
}
