//! Refresh token rotation with reuse detection
//!
//! Each refresh token is single use. Redeeming it issues a new pair and links
//! the consumed record to its successor through `replaced_by`. Presenting a
//! consumed token again revokes its whole family.

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{RefreshTokenRecord, RefreshTokenState, TokenPair, TokenType};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{TokenRepository, UserRepository};

use super::codec::JwtCodec;
use super::hasher::hash_token;

/// Service for issuing, rotating and revoking refresh tokens
pub struct RefreshTokenService<R: TokenRepository, U: UserRepository> {
    pub(crate) repository: R,
    pub(crate) users: U,
    codec: JwtCodec,
}

impl<R: TokenRepository, U: UserRepository> RefreshTokenService<R, U> {
    /// Creates a new refresh token service
    ///
    /// # Arguments
    ///
    /// * `repository` - Token store
    /// * `users` - Read access to token owners
    /// * `codec` - JWT codec used to sign and verify both token types
    pub fn new(repository: R, users: U, codec: JwtCodec) -> Self {
        Self {
            repository,
            users,
            codec,
        }
    }

    pub fn codec(&self) -> &JwtCodec {
        &self.codec
    }

    /// Issues a refresh token that starts a new family
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The raw token; only its hash is persisted
    /// * `Err(DomainError)` - Signing or persistence failed
    pub async fn create_refresh_token(&self, user_id: Uuid) -> Result<String, DomainError> {
        let family_id = Uuid::new_v4();
        let (raw, record) = self.issue_refresh_token(user_id, family_id).await?;

        info!(user_id = %user_id, family_id = %family_id, record_id = %record.id, "Refresh token family created");
        Ok(raw)
    }

    /// Issues an access token carrying `permissions`
    pub async fn issue_access_token(
        &self,
        user_id: Uuid,
        permissions: Vec<String>,
    ) -> Result<String, DomainError> {
        let claims = self.codec.access_claims(user_id, permissions);
        self.codec.encode(&claims).await
    }

    /// Issues an access token and a fresh-family refresh token after sign-in
    ///
    /// The user must exist and be active.
    pub async fn create_token_pair(&self, user_id: Uuid) -> Result<TokenPair, DomainError> {
        let user = match self.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!(user_id = %user_id, "Token pair requested for missing or disabled user");
                return Err(DomainError::authentication_required());
            }
        };

        let access_token = self.issue_access_token(user.id, user.permissions).await?;
        let refresh_token = self.create_refresh_token(user.id).await?;

        Ok(self.token_pair(access_token, refresh_token))
    }

    /// Exchanges a refresh token for a new token pair
    ///
    /// Every failure is reported as `AuthError::AuthenticationRequired`.
    /// Presenting a token that was already rotated or revoked revokes every
    /// token of its family before failing, even when the record has also
    /// expired.
    pub async fn refresh_access_token(&self, raw_token: &str) -> Result<TokenPair, DomainError> {
        let claims = match self.codec.decode(raw_token).await {
            Ok(claims) if claims.token_type == TokenType::Refresh => claims,
            Ok(claims) => {
                debug!(token_type = %claims.token_type, "Refresh rejected: wrong token type");
                return Err(DomainError::authentication_required());
            }
            Err(e) => {
                debug!(error = %e, "Refresh rejected: token failed validation");
                return Err(DomainError::authentication_required());
            }
        };

        let token_hash = hash_token(raw_token);
        let record = match self.repository.find_by_hash(&token_hash).await? {
            Some(record) => record,
            None => {
                warn!(token_hash = %token_hash, "Refresh rejected: unknown token");
                return Err(DomainError::authentication_required());
            }
        };

        if record.is_consumed() {
            self.handle_reuse(&record).await;
            return Err(DomainError::authentication_required());
        }

        let now = Utc::now();
        if record.is_expired_at(now) {
            debug!(record_id = %record.id, "Refresh rejected: record expired");
            return Err(DomainError::authentication_required());
        }

        if claims.user_id().ok() != Some(record.user_id) {
            warn!(record_id = %record.id, "Refresh rejected: subject does not match record owner");
            return Err(DomainError::authentication_required());
        }

        let user = match self.users.find_by_id(record.user_id).await? {
            Some(user) if user.is_active => user,
            Some(_) => {
                info!(user_id = %record.user_id, "Refresh rejected: user disabled");
                return Err(DomainError::authentication_required());
            }
            None => {
                info!(user_id = %record.user_id, "Refresh rejected: user not found");
                return Err(DomainError::authentication_required());
            }
        };

        let access_token = self.issue_access_token(user.id, user.permissions).await?;
        let (refresh_token, successor) = self.issue_refresh_token(user.id, record.family_id).await?;

        let mut consumed = record;
        consumed.replaced_by = Some(successor.id);

        if let Err(e) = self.repository.update(consumed.clone()).await {
            // Lost the race for this token; the successor must not stay usable
            warn!(
                record_id = %consumed.id,
                successor_id = %successor.id,
                error = %e,
                "Rotation failed, revoking orphaned successor"
            );
            if let Err(revoke_err) = self.repository.revoke_by_hash(&successor.token_hash, Utc::now()).await {
                error!(successor_id = %successor.id, error = %revoke_err, "Failed to revoke orphaned successor");
            }
            return Err(DomainError::authentication_required());
        }

        info!(
            user_id = %user.id,
            family_id = %consumed.family_id,
            record_id = %consumed.id,
            successor_id = %successor.id,
            "Refresh token rotated"
        );

        Ok(self.token_pair(access_token, refresh_token))
    }

    /// Revokes the single record with `token_hash`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record was revoked now
    /// * `Ok(false)` - Unknown hash or already revoked
    pub async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, DomainError> {
        let revoked = self.repository.revoke_by_hash(token_hash, Utc::now()).await?;
        if revoked {
            info!(token_hash = %token_hash, "Refresh token revoked");
        }
        Ok(revoked)
    }

    /// Revokes every active refresh token of a user
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of revoked records
    pub async fn revoke_all_tokens_for_user(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let count = self.repository.revoke_all_for_user(user_id, Utc::now()).await?;
        info!(user_id = %user_id, count, "Revoked all refresh tokens for user");
        Ok(count)
    }

    /// Revokes every record of a family, rotated ones included
    pub async fn revoke_family(&self, family_id: Uuid) -> Result<usize, DomainError> {
        let count = self.repository.revoke_family(family_id, Utc::now()).await?;
        info!(family_id = %family_id, count, "Revoked refresh token family");
        Ok(count)
    }

    /// Current lifecycle state of the record behind a raw token
    pub async fn record_state(&self, raw_token: &str) -> Result<Option<RefreshTokenState>, DomainError> {
        let record = self.repository.find_by_hash(&hash_token(raw_token)).await?;
        Ok(record.map(|r| r.state()))
    }

    async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        family_id: Uuid,
    ) -> Result<(String, RefreshTokenRecord), DomainError> {
        let claims = self.codec.refresh_claims(user_id);
        let raw = self.codec.encode(&claims).await?;

        let issued_at = Utc::now();
        let expires_at = claims
            .expires_at()
            .ok_or(DomainError::Token(TokenError::TokenGenerationFailed))?;

        let record = RefreshTokenRecord::new(user_id, hash_token(&raw), family_id, issued_at, expires_at);
        let record = self.repository.save(record).await?;

        Ok((raw, record))
    }

    async fn handle_reuse(&self, record: &RefreshTokenRecord) {
        warn!(
            target: "auth.token.reuse_detected",
            user_id = %record.user_id,
            family_id = %record.family_id,
            record_id = %record.id,
            "Refresh token reuse detected, revoking family"
        );

        match self.repository.revoke_family(record.family_id, Utc::now()).await {
            Ok(count) => {
                info!(family_id = %record.family_id, count, "Token family revoked after reuse");
            }
            Err(e) => {
                error!(
                    target: "auth.token.reuse_detected",
                    family_id = %record.family_id,
                    error = %e,
                    "Failed to revoke token family after reuse"
                );
            }
        }
    }

    fn token_pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        let config = self.codec.config();
        TokenPair::new(
            access_token,
            refresh_token,
            config.access_token_expiry_secs,
            config.refresh_token_expiry_secs,
        )
    }
}
