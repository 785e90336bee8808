//! Configuration for the token service

use std::str::FromStr;

use tw_shared::config::JwtConfig;

use crate::errors::DomainError;

/// Which signature algorithms the codec will sign and accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmPolicy {
    /// RSA only; an RS256 verification failure is final
    Rs256,
    /// Shared secret only
    Hs256,
    /// RS256 first, HS256 as fallback
    #[default]
    Auto,
}

impl AlgorithmPolicy {
    pub fn allows_rs256(&self) -> bool {
        matches!(self, AlgorithmPolicy::Rs256 | AlgorithmPolicy::Auto)
    }

    pub fn allows_hs256(&self) -> bool {
        matches!(self, AlgorithmPolicy::Hs256 | AlgorithmPolicy::Auto)
    }
}

impl FromStr for AlgorithmPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RS256" => Ok(AlgorithmPolicy::Rs256),
            "HS256" => Ok(AlgorithmPolicy::Hs256),
            "AUTO" => Ok(AlgorithmPolicy::Auto),
            other => Err(DomainError::Validation {
                message: format!("Unknown JWT algorithm policy: {}", other),
            }),
        }
    }
}

impl std::fmt::Display for AlgorithmPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmPolicy::Rs256 => write!(f, "RS256"),
            AlgorithmPolicy::Hs256 => write!(f, "HS256"),
            AlgorithmPolicy::Auto => write!(f, "AUTO"),
        }
    }
}

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// Signature algorithm policy
    pub policy: AlgorithmPolicy,
    /// Key id used when a token carries no usable `kid`
    pub default_key_id: String,
    /// Key id new tokens are signed with
    pub signing_key_id: String,
    /// JWT issuer
    pub issuer: String,
    /// JWT audience
    pub audience: String,
    /// Access token expiry in seconds
    pub access_token_expiry_secs: i64,
    /// Refresh token expiry in seconds
    pub refresh_token_expiry_secs: i64,
    /// Service token expiry in seconds
    pub service_token_expiry_secs: i64,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            policy: AlgorithmPolicy::Auto,
            default_key_id: "default".to_string(),
            signing_key_id: "default".to_string(),
            issuer: "tokenward".to_string(),
            audience: "tokenward-api".to_string(),
            access_token_expiry_secs: 15 * 60,
            refresh_token_expiry_secs: 30 * 24 * 60 * 60,
            service_token_expiry_secs: 5 * 60,
        }
    }
}

impl TokenServiceConfig {
    /// Build from the shared JWT configuration
    ///
    /// Fails only when `algorithm` is not one of `RS256`, `HS256`, `AUTO`.
    pub fn from_jwt_config(config: &JwtConfig) -> Result<Self, DomainError> {
        Ok(Self {
            policy: config.algorithm.parse()?,
            default_key_id: config.default_key_id.clone(),
            signing_key_id: config.signing_key_id.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_expiry_secs: config.access_token_expiry,
            refresh_token_expiry_secs: config.refresh_token_expiry,
            service_token_expiry_secs: config.service_token_expiry,
        })
    }

    pub fn with_policy(mut self, policy: AlgorithmPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_signing_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.signing_key_id = key_id.into();
        self
    }

    pub fn with_refresh_expiry_secs(mut self, secs: i64) -> Self {
        self.refresh_token_expiry_secs = secs;
        self
    }
}
