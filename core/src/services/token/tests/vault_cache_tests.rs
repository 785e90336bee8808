//! Tests for the secret-store backed key manager cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::fixtures::*;
use crate::errors::DomainError;
use crate::services::token::{
    KeyManager, SecretStore, VaultKeyManager, DEFAULT_CACHE_TTL, MAX_NEGATIVE_ENTRIES,
};

/// Secret store that counts round trips and can be switched off
#[derive(Default)]
struct CountingStore {
    values: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    down: AtomicBool,
    latency: Option<Duration>,
}

impl CountingStore {
    fn with(self, path: &str, value: &str) -> Self {
        self.values.lock().unwrap().insert(path.to_string(), value.to_string());
        self
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn set(&self, path: &str, value: &str) {
        self.values.lock().unwrap().insert(path.to_string(), value.to_string());
    }
}

#[async_trait]
impl SecretStore for CountingStore {
    async fn read_secret(&self, path: &str) -> Result<Option<String>, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(DomainError::Internal {
                message: "secret store unreachable".to_string(),
            });
        }
        Ok(self.values.lock().unwrap().get(path).cloned())
    }

    async fn health_check(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_reads_from_prefixed_paths() {
    let store = CountingStore::default()
        .with("jwt/test-key/secret", "vault-secret")
        .with("jwt/test-key/public", PUBLIC_KEY_PEM)
        .with("jwt/test-key/private", PRIVATE_KEY_PEM);
    let manager = VaultKeyManager::new(store, "/jwt/");

    assert_eq!(manager.secret(KEY_ID).await.unwrap(), Some(b"vault-secret".to_vec()));
    assert!(manager.public_key(KEY_ID).await.unwrap().is_some());
    assert!(manager.private_key(KEY_ID).await.unwrap().is_some());
    assert!(manager.secret("unknown").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_within_ttl() {
    let manager = VaultKeyManager::new(CountingStore::default().with("jwt/k/secret", "v1"), "jwt");

    assert_eq!(manager.secret("k").await.unwrap(), Some(b"v1".to_vec()));
    tokio::time::advance(DEFAULT_CACHE_TTL - Duration::from_secs(1)).await;
    assert_eq!(manager.secret("k").await.unwrap(), Some(b"v1".to_vec()));

    assert_eq!(manager.store().reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_after_ttl() {
    let manager = VaultKeyManager::new(CountingStore::default().with("jwt/k/secret", "v1"), "jwt");

    manager.secret("k").await.unwrap();
    manager.store().set("jwt/k/secret", "v2");
    tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;

    assert_eq!(manager.secret("k").await.unwrap(), Some(b"v2".to_vec()));
    assert_eq!(manager.store().reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_absence_is_cached() {
    let manager = VaultKeyManager::new(CountingStore::default(), "jwt");

    assert!(manager.public_key("k").await.unwrap().is_none());
    assert!(manager.public_key("k").await.unwrap().is_none());
    assert_eq!(manager.store().reads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_value_served_when_store_down() {
    let manager = VaultKeyManager::new(CountingStore::default().with("jwt/k/secret", "v1"), "jwt");

    manager.secret("k").await.unwrap();
    manager.store().set_down(true);
    tokio::time::advance(DEFAULT_CACHE_TTL * 3).await;

    assert_eq!(manager.secret("k").await.unwrap(), Some(b"v1".to_vec()));
    assert_eq!(manager.store().reads(), 2);
    assert!(!manager.is_available().await);
}

#[tokio::test]
async fn test_error_without_cached_value() {
    let store = CountingStore::default();
    store.set_down(true);
    let manager = VaultKeyManager::new(store, "jwt");

    assert!(manager.secret("k").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_custom_ttl_and_clear() {
    let manager = VaultKeyManager::new(CountingStore::default().with("jwt/k/secret", "v1"), "jwt")
        .with_cache_ttl(Duration::from_secs(10));

    manager.secret("k").await.unwrap();
    tokio::time::advance(Duration::from_secs(11)).await;
    manager.secret("k").await.unwrap();
    manager.clear_cache().await;
    manager.secret("k").await.unwrap();

    assert_eq!(manager.store().reads(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_fetch_once() {
    let store = CountingStore {
        latency: Some(Duration::from_millis(50)),
        ..CountingStore::default()
    }
    .with("jwt/k/secret", "v1");
    let manager = Arc::new(VaultKeyManager::new(store, "jwt"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.secret("k").await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Some(b"v1".to_vec()));
    }
    assert_eq!(manager.store().reads(), 1);
}

#[tokio::test]
async fn test_malformed_key_id_never_reaches_store() {
    let manager = VaultKeyManager::new(CountingStore::default(), "jwt");

    assert!(manager.secret("../root").await.unwrap().is_none());
    assert_eq!(manager.store().reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_key_ids_keep_cache_bounded() {
    let manager = VaultKeyManager::new(CountingStore::default().with("jwt/k/secret", "v1"), "jwt")
        .with_cache_ttl(Duration::from_secs(1));
    manager.secret("k").await.unwrap();

    for i in 0..MAX_NEGATIVE_ENTRIES + 500 {
        assert!(manager.public_key(&format!("unknown-kid-{}", i)).await.unwrap().is_none());
    }
    assert!(manager.cached_entries().await <= MAX_NEGATIVE_ENTRIES + 1);

    // Expired absences are pruned on the next insert, found keys survive
    tokio::time::advance(Duration::from_secs(3600)).await;
    assert!(manager.public_key("one-more").await.unwrap().is_none());
    assert_eq!(manager.cached_entries().await, 2);

    manager.store().set_down(true);
    assert_eq!(manager.secret("k").await.unwrap(), Some(b"v1".to_vec()));
}
