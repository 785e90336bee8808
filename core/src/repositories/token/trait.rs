//! Token repository trait defining the interface for refresh token persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::DomainError;

/// Repository trait for refresh token records
///
/// # Contract
/// - `token_hash` is unique; `save` fails with `StorageError::Integrity` on
///   a collision.
/// - `update` is a compare-and-swap on `version` and fails with
///   `StorageError::Conflict` when the stored version moved on.
/// - Bulk revocations are single statements, never per-row loops.
/// - Rows are never deleted.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a new record
    ///
    /// # Returns
    /// * `Ok(RefreshTokenRecord)` - The saved record
    /// * `Err(DomainError::Storage(StorageError::Integrity { .. }))` - Hash collision
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::{Duration, Utc};
    /// # use uuid::Uuid;
    /// # use tw_core::repositories::TokenRepository;
    /// # use tw_core::domain::entities::token::RefreshTokenRecord;
    /// # async fn example(repo: &impl TokenRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let now = Utc::now();
    /// let record = RefreshTokenRecord::new(
    ///     Uuid::new_v4(),
    ///     "sha256_hex_of_token".to_string(),
    ///     Uuid::new_v4(),
    ///     now,
    ///     now + Duration::days(30),
    /// );
    ///
    /// let saved = repo.save(record).await?;
    /// println!("Record saved with ID: {}", saved.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError>;

    /// Find a record by token hash
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DomainError>;

    /// Find a record by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError>;

    /// All records of a family, oldest first
    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError>;

    /// Unrevoked records owned by a user, newest first
    ///
    /// Rotated and expired records are included as long as `revoked_at`
    /// is unset.
    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError>;

    /// Write `revoked_at`/`replaced_by` if the stored version still equals
    /// `record.version`
    ///
    /// # Returns
    /// * `Ok(RefreshTokenRecord)` - The stored record, version incremented
    /// * `Err(DomainError::Storage(StorageError::Conflict { .. }))` - Lost the race
    async fn update(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError>;

    /// Revoke a single record by hash
    ///
    /// # Returns
    /// * `Ok(true)` - The record was revoked by this call
    /// * `Ok(false)` - No such record, or it was already revoked
    async fn revoke_by_hash(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Revoke every record of a family that is not yet revoked
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records revoked
    async fn revoke_family(&self, family_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Revoke every active record of a user
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records revoked
    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Count unrevoked records for a user
    async fn count_active_by_user(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let records = self.find_active_by_user(user_id).await?;
        Ok(records.len())
    }
}
