//! Keys fetched from a remote secret store, cached in memory
//!
//! Cached entries live for a fixed TTL. When the store cannot be reached the
//! last fetched value is served even if stale, so a store outage does not
//! break validation for key ids that were already seen.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, EncodingKey};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{is_valid_key_id, parse_private_pem, parse_public_pem, KeyManager};
use crate::errors::DomainError;

/// Cache lifetime for fetched secrets
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on cached "not found" entries
///
/// Key ids come from untrusted token headers, so absences are only cached up
/// to this many paths at a time.
pub const MAX_NEGATIVE_ENTRIES: usize = 1024;

/// Read access to a key/value secret store such as Vault KV
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`; `Ok(None)` when nothing is stored there
    async fn read_secret(&self, path: &str) -> Result<Option<String>, DomainError>;

    /// Cheap reachability probe
    async fn health_check(&self) -> bool;
}

#[derive(Debug, Clone)]
struct CachedSecret {
    /// `None` caches a confirmed absence
    value: Option<String>,
    fetched_at: Instant,
}

/// Secret-store backed key manager
///
/// Secrets live at `<prefix>/<kid>/private`, `<prefix>/<kid>/public` and
/// `<prefix>/<kid>/secret`.
pub struct VaultKeyManager<S: SecretStore> {
    store: S,
    key_prefix: String,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, CachedSecret>>,
    /// Serializes store round trips so concurrent misses fetch once
    fetch_lock: Mutex<()>,
}

impl<S: SecretStore> VaultKeyManager<S> {
    pub fn new(store: S, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into().trim_matches('/').to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: RwLock::new(HashMap::new()),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drop every cached secret
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached paths, found or not
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }

    fn secret_path(&self, key_id: &str, name: &str) -> String {
        if self.key_prefix.is_empty() {
            format!("{}/{}", key_id, name)
        } else {
            format!("{}/{}/{}", self.key_prefix, key_id, name)
        }
    }

    /// Cached value if present and younger than the TTL
    async fn fresh(&self, path: &str) -> Option<Option<String>> {
        let cache = self.cache.read().await;
        cache
            .get(path)
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.value.clone())
    }

    /// Cache a fetch result
    ///
    /// Expired absences are pruned on every insert. Found values are kept past
    /// their TTL so they can still be served while the store is down.
    async fn remember(&self, path: String, value: Option<String>) {
        let ttl = self.cache_ttl;
        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| entry.value.is_some() || entry.fetched_at.elapsed() < ttl);

        if value.is_none() {
            cache.remove(&path);
            let negatives = cache.values().filter(|entry| entry.value.is_none()).count();
            if negatives >= MAX_NEGATIVE_ENTRIES {
                debug!(path = %path, "Negative cache full, not caching absence");
                return;
            }
        }

        cache.insert(
            path,
            CachedSecret {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn secret_value(&self, key_id: &str, name: &str) -> Result<Option<String>, DomainError> {
        if !is_valid_key_id(key_id) {
            debug!(key_id = %key_id, "Rejected malformed key id");
            return Ok(None);
        }

        let path = self.secret_path(key_id, name);

        if let Some(value) = self.fresh(&path).await {
            return Ok(value);
        }

        let _guard = self.fetch_lock.lock().await;

        // Another task may have filled the entry while we waited
        if let Some(value) = self.fresh(&path).await {
            return Ok(value);
        }

        match self.store.read_secret(&path).await {
            Ok(value) => {
                debug!(path = %path, found = value.is_some(), "Fetched secret from store");
                self.remember(path, value.clone()).await;
                Ok(value)
            }
            Err(e) => {
                let cache = self.cache.read().await;
                match cache.get(&path) {
                    Some(stale) => {
                        warn!(path = %path, error = %e, "Secret store unavailable, serving stale cached value");
                        Ok(stale.value.clone())
                    }
                    None => {
                        warn!(path = %path, error = %e, "Secret store unavailable and nothing cached");
                        Err(e)
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: SecretStore> KeyManager for VaultKeyManager<S> {
    async fn private_key(&self, key_id: &str) -> Result<Option<EncodingKey>, DomainError> {
        match self.secret_value(key_id, "private").await? {
            Some(pem) => parse_private_pem(key_id, pem.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    async fn public_key(&self, key_id: &str) -> Result<Option<DecodingKey>, DomainError> {
        match self.secret_value(key_id, "public").await? {
            Some(pem) => parse_public_pem(key_id, pem.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    async fn secret(&self, key_id: &str) -> Result<Option<Vec<u8>>, DomainError> {
        Ok(self
            .secret_value(key_id, "secret")
            .await?
            .filter(|s| !s.is_empty())
            .map(String::into_bytes))
    }

    async fn is_available(&self) -> bool {
        self.store.health_check().await
    }
}
