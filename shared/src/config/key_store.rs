//! Key store configuration (file system or secret vault)

use serde::{Deserialize, Serialize};

/// Which backend serves signing and verification keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreProvider {
    /// PEM/secret files under a local directory
    File,
    /// HashiCorp Vault KV v2
    Vault,
    /// Vault when configured and reachable, otherwise files
    #[default]
    Auto,
}

impl std::str::FromStr for KeyStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "files" => Ok(KeyStoreProvider::File),
            "vault" => Ok(KeyStoreProvider::Vault),
            "auto" => Ok(KeyStoreProvider::Auto),
            _ => Err(format!("Invalid key store provider: {}", s)),
        }
    }
}

/// Vault connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Vault address, e.g. `https://vault.internal:8200`
    pub addr: String,

    /// Vault token sent as `X-Vault-Token`
    pub token: String,

    /// KV v2 mount point
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Path prefix under which `<kid>/private`, `<kid>/public` and `<kid>/secret` live
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Key store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyStoreConfig {
    /// Backend selection
    #[serde(default)]
    pub provider: KeyStoreProvider,

    /// Directory holding `<kid>/private.pem`, `<kid>/public.pem`, `<kid>/secret`
    pub keys_dir: String,

    /// Vault settings, absent when no vault is configured
    #[serde(default)]
    pub vault: Option<VaultConfig>,

    /// Lifetime of cached vault keys in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            provider: KeyStoreProvider::default(),
            keys_dir: String::from("keys"),
            vault: None,
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl KeyStoreConfig {
    /// Create from environment variables
    ///
    /// The vault section is only populated when both `VAULT_ADDR` and
    /// `VAULT_TOKEN` are set.
    pub fn from_env() -> Self {
        let vault = match (std::env::var("VAULT_ADDR"), std::env::var("VAULT_TOKEN")) {
            (Ok(addr), Ok(token)) => Some(VaultConfig {
                addr,
                token,
                mount: std::env::var("VAULT_MOUNT").unwrap_or_else(|_| default_mount()),
                key_prefix: std::env::var("VAULT_KEY_PREFIX")
                    .unwrap_or_else(|_| default_key_prefix()),
                request_timeout: std::env::var("VAULT_REQUEST_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_request_timeout),
            }),
            _ => None,
        };

        Self {
            provider: std::env::var("KEY_STORE_PROVIDER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            keys_dir: std::env::var("JWT_KEYS_DIR").unwrap_or_else(|_| String::from("keys")),
            vault,
            cache_ttl_seconds: std::env::var("KEY_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_cache_ttl),
        }
    }
}

fn default_mount() -> String {
    String::from("secret")
}

fn default_key_prefix() -> String {
    String::from("jwt")
}

fn default_request_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}
