//! Keys read from a directory laid out as `<dir>/<kid>/{private.pem,public.pem,secret}`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey};
use tracing::debug;

use super::{is_valid_key_id, parse_private_pem, parse_public_pem, KeyManager};
use crate::errors::{DomainError, TokenError};

const PRIVATE_KEY_FILE: &str = "private.pem";
const PUBLIC_KEY_FILE: &str = "public.pem";
const SECRET_FILE: &str = "secret";

/// File-backed key manager
///
/// Files are read on every lookup so rotated keys are picked up without a
/// restart.
#[derive(Debug, Clone)]
pub struct FileKeyManager {
    keys_dir: PathBuf,
}

impl FileKeyManager {
    /// Creates a key manager rooted at `keys_dir`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tw_core::services::token::FileKeyManager;
    ///
    /// let key_manager = FileKeyManager::new("keys");
    /// ```
    pub fn new<P: AsRef<Path>>(keys_dir: P) -> Self {
        Self {
            keys_dir: keys_dir.as_ref().to_path_buf(),
        }
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    /// Reads `<dir>/<kid>/<file>`; a missing file or invalid key id is `None`
    async fn read_key_file(&self, key_id: &str, file: &str) -> Result<Option<Vec<u8>>, DomainError> {
        if !is_valid_key_id(key_id) {
            debug!(key_id = %key_id, "Rejected malformed key id");
            return Ok(None);
        }

        let path = self.keys_dir.join(key_id).join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::Token(TokenError::KeyLoad {
                message: format!("Failed to read {}: {}", path.display(), e),
            })),
        }
    }
}

#[async_trait]
impl KeyManager for FileKeyManager {
    async fn private_key(&self, key_id: &str) -> Result<Option<EncodingKey>, DomainError> {
        match self.read_key_file(key_id, PRIVATE_KEY_FILE).await? {
            Some(pem) => parse_private_pem(key_id, &pem).map(Some),
            None => Ok(None),
        }
    }

    async fn public_key(&self, key_id: &str) -> Result<Option<DecodingKey>, DomainError> {
        match self.read_key_file(key_id, PUBLIC_KEY_FILE).await? {
            Some(pem) => parse_public_pem(key_id, &pem).map(Some),
            None => Ok(None),
        }
    }

    async fn secret(&self, key_id: &str) -> Result<Option<Vec<u8>>, DomainError> {
        let secret = self.read_key_file(key_id, SECRET_FILE).await?;

        // Editors leave a trailing newline; an empty secret is no secret
        Ok(secret
            .map(|mut bytes| {
                while bytes.last().map_or(false, |b| b.is_ascii_whitespace()) {
                    bytes.pop();
                }
                bytes
            })
            .filter(|bytes| !bytes.is_empty()))
    }

    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.keys_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}
