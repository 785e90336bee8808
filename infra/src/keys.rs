//! Key manager selection at startup
//!
//! `file` and `vault` are taken as configured. `auto` probes Vault first
//! (when configured) and falls back to the keys directory.

use std::sync::Arc;
use std::time::Duration;

use tw_core::services::token::{FileKeyManager, KeyManager, SecretStore, VaultKeyManager};
use tw_shared::config::{KeyStoreConfig, KeyStoreProvider, VaultConfig};

use crate::vault::HttpVaultSecretStore;
use crate::InfrastructureError;

/// Resolve `auto` to a concrete backend by probing availability
///
/// # Errors
///
/// Returns an error when `vault` is requested without Vault settings, or
/// when `auto` finds neither a reachable Vault nor a keys directory.
pub async fn select_provider(config: &KeyStoreConfig) -> Result<KeyStoreProvider, InfrastructureError> {
    match config.provider {
        KeyStoreProvider::Vault if config.vault.is_none() => Err(InfrastructureError::Config(
            "KEY_STORE_PROVIDER=vault requires VAULT_ADDR and VAULT_TOKEN".to_string(),
        )),
        KeyStoreProvider::Vault | KeyStoreProvider::File => Ok(config.provider),
        KeyStoreProvider::Auto => {
            if let Some(vault) = &config.vault {
                if HttpVaultSecretStore::new(vault)?.health_check().await {
                    return Ok(KeyStoreProvider::Vault);
                }
                tracing::warn!("Vault at {} is unreachable, falling back to file keys", vault.addr);
            }

            if FileKeyManager::new(&config.keys_dir).is_available().await {
                Ok(KeyStoreProvider::File)
            } else {
                Err(InfrastructureError::KeyStore(format!(
                    "No reachable Vault and keys directory {} does not exist",
                    config.keys_dir
                )))
            }
        }
    }
}

/// Build the key manager for the configured (or probed) backend
pub async fn build_key_manager(config: &KeyStoreConfig) -> Result<Arc<dyn KeyManager>, InfrastructureError> {
    match select_provider(config).await? {
        KeyStoreProvider::Vault => {
            let vault = config.vault.as_ref().ok_or_else(|| {
                InfrastructureError::Config("Vault settings missing".to_string())
            })?;
            let manager = vault_key_manager(vault, config.cache_ttl_seconds)?;
            if !manager.is_available().await {
                tracing::warn!("Vault is not reachable yet; key lookups will fail until it is");
            }
            tracing::info!("Using Vault key store at {}", vault.addr);
            Ok(Arc::new(manager))
        }
        _ => {
            let manager = FileKeyManager::new(&config.keys_dir);
            if !manager.is_available().await {
                tracing::warn!("Keys directory {} does not exist", config.keys_dir);
            }
            tracing::info!("Using file key store at {}", config.keys_dir);
            Ok(Arc::new(manager))
        }
    }
}

fn vault_key_manager(
    vault: &VaultConfig,
    cache_ttl_seconds: u64,
) -> Result<VaultKeyManager<HttpVaultSecretStore>, InfrastructureError> {
    let store = HttpVaultSecretStore::new(vault)?;
    Ok(VaultKeyManager::new(store, vault.key_prefix.clone())
        .with_cache_ttl(Duration::from_secs(cache_ttl_seconds)))
}
