//! JWT signing and validation configuration

use serde::{Deserialize, Serialize};

use super::key_store::KeyStoreConfig;

/// JWT configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Signature algorithm policy: `RS256`, `HS256` or `AUTO`
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Key id used when a token header carries no (or an unreadable) `kid`
    pub default_key_id: String,

    /// Key id stamped into the header of newly signed tokens
    pub signing_key_id: String,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,

    /// Access token expiry time in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// Service token expiry time in seconds
    pub service_token_expiry: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            default_key_id: String::from("default"),
            signing_key_id: String::from("default"),
            issuer: String::from("tokenward"),
            audience: String::from("tokenward-api"),
            access_token_expiry: 900,        // 15 minutes
            refresh_token_expiry: 2_592_000, // 30 days
            service_token_expiry: 300,       // 5 minutes
        }
    }
}

impl JwtConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_key_id = std::env::var("JWT_DEFAULT_KEY_ID")
            .unwrap_or(defaults.default_key_id);
        Self {
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or(defaults.algorithm),
            signing_key_id: std::env::var("JWT_SIGNING_KEY_ID")
                .unwrap_or_else(|_| default_key_id.clone()),
            default_key_id,
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            access_token_expiry: env_seconds("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
            refresh_token_expiry: env_seconds("JWT_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry),
            service_token_expiry: env_seconds("JWT_SERVICE_TOKEN_EXPIRY", defaults.service_token_expiry),
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Set the algorithm policy
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Signing/verification key backend
    #[serde(default)]
    pub key_store: KeyStoreConfig,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig::from_env(),
            key_store: KeyStoreConfig::from_env(),
        }
    }
}

fn default_algorithm() -> String {
    String::from("AUTO")
}

fn env_seconds(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
