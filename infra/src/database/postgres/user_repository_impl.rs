//! PostgreSQL lookup of token owners

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tw_core::domain::entities::user::User;
use tw_core::errors::DomainError;
use tw_core::repositories::UserRepository;

use super::db_error;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    is_active: bool,
    permissions: Vec<String>,
}

/// Reads `users(id, is_active, permissions)`, created by the bundled migrations
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, is_active, permissions FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find user by id", e))?;

        Ok(row.map(|row| User {
            id: row.id,
            is_active: row.is_active,
            permissions: row.permissions,
        }))
    }
}
