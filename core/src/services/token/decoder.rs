//! Request principal from a bearer token

use tracing::debug;

use crate::domain::entities::principal::Principal;
use crate::domain::entities::token::TokenType;
use crate::errors::DomainError;

use super::codec::JwtCodec;

/// Turns a raw bearer token into a `Principal`
///
/// Service tokens yield a service principal (optionally delegated); every
/// other token must be an access token. Refresh tokens are never accepted as
/// credentials. No database lookups happen here.
#[derive(Debug, Clone)]
pub struct PrincipalDecoder {
    codec: JwtCodec,
}

impl PrincipalDecoder {
    pub fn new(codec: JwtCodec) -> Self {
        Self { codec }
    }

    /// # Returns
    ///
    /// * `Ok(Principal)` - Token verified
    /// * `Err(DomainError)` - Always `AuthError::AuthenticationRequired`
    pub async fn from_token(&self, raw_token: &str) -> Result<Principal, DomainError> {
        let claims = self.codec.decode(raw_token).await.map_err(|e| {
            debug!(error = %e, "Bearer token failed validation");
            DomainError::authentication_required()
        })?;

        match claims.token_type {
            TokenType::Service => Ok(Principal::service(
                claims.sub,
                claims.permissions,
                claims.user_context,
            )),
            TokenType::Access => {
                let user_id = claims.user_id().map_err(|_| {
                    debug!("Access token subject is not a user id");
                    DomainError::authentication_required()
                })?;
                Ok(Principal::user(user_id, claims.permissions))
            }
            TokenType::Refresh => {
                debug!("Refresh token presented as bearer credential");
                Err(DomainError::authentication_required())
            }
        }
    }
}
