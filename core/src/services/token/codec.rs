//! JWT encoding and verification with key-id routing
//!
//! Verification order is fixed: the key id comes from the unverified
//! header (or the configured default), RS256 is tried first when the policy
//! allows it and a public key exists, and HS256 is only reached when the
//! policy is `HS256` or `AUTO`. Under an `RS256` policy an RS256 failure is
//! final.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::config::{AlgorithmPolicy, TokenServiceConfig};
use super::key_manager::{is_valid_key_id, KeyManager};
use crate::domain::entities::token::{Claims, TokenType, UserContext};
use crate::errors::{DomainError, TokenError};

/// Signs and verifies compact JWTs
#[derive(Clone)]
pub struct JwtCodec {
    key_manager: Arc<dyn KeyManager>,
    config: TokenServiceConfig,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JwtCodec {
    pub fn new(key_manager: Arc<dyn KeyManager>, config: TokenServiceConfig) -> Self {
        Self { key_manager, config }
    }

    pub fn config(&self) -> &TokenServiceConfig {
        &self.config
    }

    pub fn policy(&self) -> AlgorithmPolicy {
        self.config.policy
    }

    /// Claims for a user access token
    pub fn access_claims(&self, user_id: Uuid, permissions: Vec<String>) -> Claims {
        Claims::new(
            user_id.to_string(),
            TokenType::Access,
            Duration::seconds(self.config.access_token_expiry_secs),
            &self.config.issuer,
            &self.config.audience,
        )
        .with_permissions(permissions)
    }

    /// Claims for a refresh token; refresh tokens carry no permissions
    pub fn refresh_claims(&self, user_id: Uuid) -> Claims {
        Claims::new(
            user_id.to_string(),
            TokenType::Refresh,
            Duration::seconds(self.config.refresh_token_expiry_secs),
            &self.config.issuer,
            &self.config.audience,
        )
    }

    /// Claims for a service token, optionally acting for an end user
    pub fn service_claims(
        &self,
        service_id: &str,
        permissions: Vec<String>,
        user_context: Option<UserContext>,
    ) -> Claims {
        Claims::new(
            service_id,
            TokenType::Service,
            Duration::seconds(self.config.service_token_expiry_secs),
            &self.config.issuer,
            &self.config.audience,
        )
        .with_permissions(permissions)
        .with_user_context(user_context)
    }

    /// Sign claims with the configured signing key id
    ///
    /// `RS256` signs with the private key, `HS256` with the secret, and
    /// `AUTO` prefers the private key.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Compact JWT
    /// * `Err(DomainError)` - No usable signing key
    pub async fn encode(&self, claims: &Claims) -> Result<String, DomainError> {
        let key_id = &self.config.signing_key_id;
        let policy = self.config.policy;

        let mut signing: Option<(Algorithm, EncodingKey)> = None;

        if policy.allows_rs256() {
            match self.key_manager.private_key(key_id).await {
                Ok(Some(key)) => signing = Some((Algorithm::RS256, key)),
                Ok(None) => {}
                Err(e) => warn!(key_id = %key_id, error = %e, "Private key lookup failed"),
            }
        }

        if signing.is_none() && policy.allows_hs256() {
            if let Some(secret) = self.lookup_secret(key_id).await {
                signing = Some((Algorithm::HS256, EncodingKey::from_secret(&secret)));
            }
        }

        let (algorithm, key) = signing.ok_or_else(|| {
            error!(key_id = %key_id, policy = %policy, "No signing key available");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })?;

        let mut header = Header::new(algorithm);
        header.kid = Some(key_id.clone());

        encode(&header, claims, &key).map_err(|e| {
            error!(key_id = %key_id, error = %e, "Failed to sign token");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })
    }

    /// Verify a token and return its claims
    ///
    /// Signature, `exp`, `nbf`, `iss` and `aud` are all checked.
    pub async fn decode(&self, token: &str) -> Result<Claims, DomainError> {
        let key_id = decode_header(token)
            .ok()
            .and_then(|header| header.kid)
            .filter(|kid| is_valid_key_id(kid))
            .unwrap_or_else(|| self.config.default_key_id.clone());
        let policy = self.config.policy;

        let mut last_error: Option<DomainError> = None;

        if policy.allows_rs256() {
            if let Some(key) = self.lookup_public_key(&key_id).await {
                match self.verify(token, &key, Algorithm::RS256) {
                    Ok(claims) => return Ok(claims),
                    // Expiry is only reported once the signature has verified
                    Err(e @ DomainError::Token(TokenError::TokenExpired)) => return Err(e),
                    Err(e) if policy == AlgorithmPolicy::Rs256 => return Err(e),
                    Err(e) => {
                        debug!(key_id = %key_id, error = %e, "RS256 verification failed, trying HS256");
                        last_error = Some(e);
                    }
                }
            }
        }

        if policy.allows_hs256() {
            if let Some(secret) = self.lookup_secret(&key_id).await {
                return self.verify(token, &DecodingKey::from_secret(&secret), Algorithm::HS256);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            debug!(key_id = %key_id, policy = %policy, "No valid key available");
            DomainError::Token(TokenError::NoValidKey { key_id })
        }))
    }

    fn verify(&self, token: &str, key: &DecodingKey, algorithm: Algorithm) -> Result<Claims, DomainError> {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_nbf = true;

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::Token(TokenError::TokenExpired),
                _ => DomainError::Token(TokenError::InvalidToken),
            })
    }

    async fn lookup_public_key(&self, key_id: &str) -> Option<DecodingKey> {
        match self.key_manager.public_key(key_id).await {
            Ok(key) => key,
            Err(e) => {
                warn!(key_id = %key_id, error = %e, "Public key lookup failed, treating as unavailable");
                None
            }
        }
    }

    async fn lookup_secret(&self, key_id: &str) -> Option<Vec<u8>> {
        match self.key_manager.secret(key_id).await {
            Ok(secret) => secret,
            Err(e) => {
                warn!(key_id = %key_id, error = %e, "Secret lookup failed, treating as unavailable");
                None
            }
        }
    }

    /// Whether the token is valid and of the given type
    pub async fn is_token_type(&self, token: &str, token_type: TokenType) -> bool {
        self.decode(token)
            .await
            .map(|claims| claims.token_type == token_type)
            .unwrap_or(false)
    }

    pub async fn is_access_token(&self, token: &str) -> bool {
        self.is_token_type(token, TokenType::Access).await
    }

    pub async fn is_refresh_token(&self, token: &str) -> bool {
        self.is_token_type(token, TokenType::Refresh).await
    }

    pub async fn is_service_token(&self, token: &str) -> bool {
        self.is_token_type(token, TokenType::Service).await
    }

    /// Expiry of a valid token
    pub async fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        self.decode(token).await.ok().and_then(|claims| claims.expires_at())
    }

    /// `true` only when the token is authentic but past its expiry
    pub async fn is_expired(&self, token: &str) -> bool {
        match self.decode(token).await {
            Ok(claims) => claims.is_expired(),
            Err(DomainError::Token(TokenError::TokenExpired)) => true,
            Err(_) => false,
        }
    }

    /// End user behind the token
    ///
    /// For access and refresh tokens this is the subject; for service tokens
    /// it is the delegated user, if any.
    pub async fn user_id(&self, token: &str) -> Option<Uuid> {
        let claims = self.decode(token).await.ok()?;
        match claims.token_type {
            TokenType::Service => claims.user_context.map(|ctx| ctx.user_id),
            _ => claims.user_id().ok(),
        }
    }

    /// Permissions granted to the token's subject, empty on failure
    pub async fn permissions(&self, token: &str) -> Vec<String> {
        self.decode(token)
            .await
            .map(|claims| claims.permissions)
            .unwrap_or_default()
    }

    /// Delegated end-user context of a service token
    pub async fn service_user_context(&self, token: &str) -> Option<UserContext> {
        let claims = self.decode(token).await.ok()?;
        if claims.token_type != TokenType::Service {
            return None;
        }
        claims.user_context
    }
}
