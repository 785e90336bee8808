//! Token entities: JWT claims, persisted refresh token records and token pairs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of token carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived bearer token for API calls
    Access,
    /// Long-lived, single-use token exchanged for a new pair
    Refresh,
    /// Service-to-service token, optionally carrying a delegated end user
    Service,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
            TokenType::Service => write!(f, "service"),
        }
    }
}

/// End-user context embedded in a service token for delegated calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// The end user on whose behalf the service is acting
    pub user_id: Uuid,

    /// Permissions of that end user
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Claims structure for JWT payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID, or service ID for service tokens)
    pub sub: String,

    /// Token type
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Issued at timestamp
    pub iat: i64,

    /// Not before timestamp
    pub nbf: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// JWT ID, random per token
    pub jti: String,

    /// Granted permissions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    /// Delegated end user (service tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContext>,

    /// Any further claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Creates claims valid from now for `ttl`
    pub fn new(
        subject: impl Into<String>,
        token_type: TokenType,
        ttl: Duration,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let expiry = now + ttl;

        Self {
            sub: subject.into(),
            token_type,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expiry.timestamp(),
            iss: issuer.into(),
            aud: audience.into(),
            jti: Uuid::new_v4().to_string(),
            permissions: Vec::new(),
            user_context: None,
            extra: Map::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_user_context(mut self, user_context: Option<UserContext>) -> Self {
        self.user_context = user_context;
        self
    }

    /// Adds an arbitrary claim; reserved names are left untouched
    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        if !RESERVED_CLAIMS.contains(&name.as_str()) {
            self.extra.insert(name, value);
        }
        self
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Expiry as a timestamp, `None` if `exp` is out of range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Gets the user ID from the subject
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

const RESERVED_CLAIMS: &[&str] = &[
    "sub", "type", "iat", "nbf", "exp", "iss", "aud", "jti", "permissions", "user_context",
];

/// Lifecycle state of a refresh token record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenState {
    Active,
    Rotated,
    Revoked,
    Expired,
}

/// Refresh token record stored in the `refresh_tokens` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Time-ordered unique identifier
    pub id: Uuid,

    /// User ID this token belongs to
    pub user_id: Uuid,

    /// SHA-256 hex of the raw token
    pub token_hash: String,

    /// All tokens rotated from one login share a family
    pub family_id: Uuid,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Set on explicit revocation or reuse detection
    pub revoked_at: Option<DateTime<Utc>>,

    /// Successor record, set when this token was consumed by a rotation
    pub replaced_by: Option<Uuid>,

    /// Optimistic concurrency counter
    pub version: i64,
}

impl RefreshTokenRecord {
    /// Creates a new active record
    pub fn new(
        user_id: Uuid,
        token_hash: String,
        family_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            token_hash,
            family_id,
            issued_at,
            expires_at,
            revoked_at: None,
            replaced_by: None,
            version: 0,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_rotated(&self) -> bool {
        self.replaced_by.is_some()
    }

    /// Revoked or already rotated: presenting it again is a reuse
    pub fn is_consumed(&self) -> bool {
        self.is_revoked() || self.is_rotated()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Revoked wins over rotated, which wins over expired
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.is_revoked() {
            RefreshTokenState::Revoked
        } else if self.is_rotated() {
            RefreshTokenState::Rotated
        } else if self.is_expired_at(now) {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    pub fn state(&self) -> RefreshTokenState {
        self.state_at(Utc::now())
    }

    /// Marks the record revoked; a record keeps its first revocation time
    pub fn revoke(&mut self, at: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(at);
        }
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    pub fn new(
        access_token: String,
        refresh_token: String,
        access_expires_in: i64,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_in,
            refresh_expires_in,
        }
    }
}
