//! In-memory TokenRepository for tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::{DomainError, StorageError};

use super::r#trait::TokenRepository;

/// Mock token repository keyed by record id
///
/// Each operation holds the write lock for its whole duration, which gives
/// the same atomicity as the single-statement SQL implementation.
pub struct MockTokenRepository {
    records: Arc<RwLock<HashMap<Uuid, RefreshTokenRecord>>>,
    fail_family_revocation: AtomicBool,
}

impl MockTokenRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            fail_family_revocation: AtomicBool::new(false),
        }
    }

    /// Make `revoke_family` return an error from now on
    pub fn fail_family_revocation(&self) {
        self.fail_family_revocation.store(true, Ordering::SeqCst);
    }

    /// Overwrite a record without any version check (test setup only)
    pub async fn put(&self, record: RefreshTokenRecord) {
        self.records.write().await.insert(record.id, record);
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for MockTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError> {
        let mut records = self.records.write().await;

        if records.values().any(|r| r.token_hash == record.token_hash) {
            return Err(StorageError::Integrity {
                message: "duplicate token hash".to_string(),
            }
            .into());
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.values().find(|r| r.token_hash == token_hash).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let records = self.records.read().await;
        let mut family: Vec<_> = records
            .values()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect();
        family.sort_by_key(|r| r.id);
        Ok(family)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let records = self.records.read().await;
        let mut active: Vec<_> = records
            .values()
            .filter(|r| r.user_id == user_id && !r.is_revoked())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(active)
    }

    async fn update(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError> {
        let mut records = self.records.write().await;

        match records.get_mut(&record.id) {
            Some(stored) if stored.version == record.version => {
                stored.revoked_at = record.revoked_at;
                stored.replaced_by = record.replaced_by;
                stored.version += 1;
                Ok(stored.clone())
            }
            _ => Err(StorageError::Conflict { id: record.id }.into()),
        }
    }

    async fn revoke_by_hash(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;

        match records.values_mut().find(|r| r.token_hash == token_hash) {
            Some(record) if !record.is_revoked() => {
                record.revoke(at);
                record.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_family(&self, family_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError> {
        if self.fail_family_revocation.load(Ordering::SeqCst) {
            return Err(DomainError::Internal {
                message: "family revocation unavailable".to_string(),
            });
        }

        let mut records = self.records.write().await;
        let mut count = 0;

        for record in records.values_mut() {
            if record.family_id == family_id && !record.is_revoked() {
                record.revoke(at);
                record.version += 1;
                count += 1;
            }
        }

        Ok(count)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut records = self.records.write().await;
        let mut count = 0;

        for record in records.values_mut() {
            if record.user_id == user_id && !record.is_revoked() {
                record.revoke(at);
                record.version += 1;
                count += 1;
            }
        }

        Ok(count)
    }
}
