//! Vault KV v2 secret store over HTTP
//!
//! Reads `GET {addr}/v1/{mount}/data/{path}` with the `X-Vault-Token`
//! header and returns the `value` field of the stored secret.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use tw_core::errors::DomainError;
use tw_core::services::token::SecretStore;
use tw_shared::config::VaultConfig;

use crate::InfrastructureError;

const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";
const VALUE_FIELD: &str = "value";

#[derive(Debug, Deserialize)]
struct KvV2Response {
    data: KvV2Data,
}

#[derive(Debug, Deserialize)]
struct KvV2Data {
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// HTTP client for a Vault KV v2 mount
#[derive(Clone)]
pub struct HttpVaultSecretStore {
    http_client: reqwest::Client,
    addr: String,
    token: String,
    mount: String,
}

impl std::fmt::Debug for HttpVaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVaultSecretStore")
            .field("addr", &self.addr)
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}

impl HttpVaultSecretStore {
    /// Creates a client from the Vault section of the key store config
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &VaultConfig) -> Result<Self, InfrastructureError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            http_client,
            addr: config.addr.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            mount: config.mount.trim_matches('/').to_string(),
        })
    }

    fn secret_url(&self, path: &str) -> String {
        format!("{}/v1/{}/data/{}", self.addr, self.mount, path.trim_start_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/v1/sys/health", self.addr)
    }
}

#[async_trait]
impl SecretStore for HttpVaultSecretStore {
    async fn read_secret(&self, path: &str) -> Result<Option<String>, DomainError> {
        let url = self.secret_url(path);
        tracing::debug!("Reading secret {} from Vault", path);

        let response = self
            .http_client
            .get(&url)
            .header(VAULT_TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach Vault for {}: {}", path, e);
                DomainError::Internal {
                    message: format!("Vault request failed: {}", e),
                }
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(DomainError::Internal {
                message: format!("Vault returned status {} for {}", response.status().as_u16(), path),
            });
        }

        let body: KvV2Response = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse Vault response for {}: {}", path, e);
            DomainError::Internal {
                message: format!("Invalid Vault response: {}", e),
            }
        })?;

        // A soft-deleted version comes back with `data: null`
        Ok(body
            .data
            .data
            .and_then(|mut fields| fields.remove(VALUE_FIELD))
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    async fn health_check(&self) -> bool {
        match self.http_client.get(self.health_url()).send().await {
            // 429 is an unsealed standby node, which still serves reads
            Ok(response) => {
                response.status().is_success() || response.status() == StatusCode::TOO_MANY_REQUESTS
            }
            Err(e) => {
                tracing::warn!("Vault health check failed: {}", e);
                false
            }
        }
    }
}
