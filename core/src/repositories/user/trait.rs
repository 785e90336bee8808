//! User repository trait defining the read-only user lookup the token
//! subsystem depends on.
//!
//! User management lives elsewhere; refresh only needs to know whether the
//! owner still exists, is active, and which permissions to mint.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::user::User;
use crate::errors::DomainError;

/// Repository trait for resolving users by id
///
/// # Example Implementation
/// ```no_run
/// use async_trait::async_trait;
/// use uuid::Uuid;
/// use tw_core::repositories::UserRepository;
/// use tw_core::domain::entities::user::User;
/// use tw_core::errors::DomainError;
///
/// struct FixedUserRepository {
///     user: User,
/// }
///
/// #[async_trait]
/// impl UserRepository for FixedUserRepository {
///     async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
///         Ok((self.user.id == id).then(|| self.user.clone()))
///     }
/// }
/// ```
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by unique ID
    ///
    /// # Returns
    /// * `Ok(Some(User))` - User found
    /// * `Ok(None)` - User not found
    /// * `Err(DomainError)` - Lookup failed
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
}
