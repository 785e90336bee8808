//! PostgreSQL implementation of the TokenRepository trait.
//!
//! Records are only ever inserted or updated. Version-guarded updates and
//! bulk revocations are single statements, so a family is never left
//! partially revoked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tw_core::domain::entities::token::RefreshTokenRecord;
use tw_core::errors::{DomainError, StorageError};
use tw_core::repositories::TokenRepository;

use super::db_error;

const COLUMNS: &str =
    "id, user_id, token_hash, family_id, issued_at, expires_at, revoked_at, replaced_by, version";

/// Row shape of `refresh_tokens`
#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    family_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    replaced_by: Option<Uuid>,
    version: i64,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            family_id: row.family_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            replaced_by: row.replaced_by,
            version: row.version,
        }
    }
}

/// PostgreSQL implementation of TokenRepository
#[derive(Clone)]
pub struct PostgresTokenRepository {
    /// Database connection pool
    pool: PgPool,
}

impl PostgresTokenRepository {
    /// Create a new PostgreSQL token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError> {
        let query = format!(
            r#"
            INSERT INTO refresh_tokens ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        );

        let row: RefreshTokenRow = sqlx::query_as(&query)
            .bind(record.id)
            .bind(record.user_id)
            .bind(&record.token_hash)
            .bind(record.family_id)
            .bind(record.issued_at)
            .bind(record.expires_at)
            .bind(record.revoked_at)
            .bind(record.replaced_by)
            .bind(record.version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.is_unique_violation() {
                        tracing::error!(record_id = %record.id, "Refresh token hash collision");
                        return DomainError::Storage(StorageError::Integrity {
                            message: "refresh token hash already exists".to_string(),
                        });
                    }
                }
                db_error("save refresh token", e)
            })?;

        Ok(row.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1");

        let row: Option<RefreshTokenRow> = sqlx::query_as(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find refresh token by hash", e))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE id = $1");

        let row: Option<RefreshTokenRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find refresh token by id", e))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_family(&self, family_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE family_id = $1 ORDER BY id");

        let rows: Vec<RefreshTokenRow> = sqlx::query_as(&query)
            .bind(family_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find refresh token family", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, DomainError> {
        let query = format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL ORDER BY id DESC"
        );

        let rows: Vec<RefreshTokenRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find active refresh tokens", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, DomainError> {
        let query = format!(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $3, replaced_by = $4, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {COLUMNS}
            "#
        );

        let row: Option<RefreshTokenRow> = sqlx::query_as(&query)
            .bind(record.id)
            .bind(record.version)
            .bind(record.revoked_at)
            .bind(record.replaced_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update refresh token", e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                tracing::debug!(record_id = %record.id, version = record.version, "Refresh token version conflict");
                Err(StorageError::Conflict { id: record.id }.into())
            }
        }
    }

    async fn revoke_by_hash(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2, version = version + 1
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("revoke refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_family(&self, family_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2, version = version + 1
            WHERE family_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(family_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("revoke refresh token family", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2, version = version + 1
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("revoke user refresh tokens", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count active refresh tokens", e))?;

        Ok(count as usize)
    }
}
