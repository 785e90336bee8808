//! Integration tests for the PostgreSQL token store
//!
//! These tests require a running PostgreSQL instance to execute.
//! Run with: DATABASE_URL=postgres://... cargo test -p tw_infra --test postgres_token_repository -- --ignored

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use tw_core::domain::entities::token::RefreshTokenRecord;
use tw_core::errors::{AuthError, DomainError, StorageError};
use tw_core::repositories::{TokenRepository, UserRepository};
use tw_core::services::token::{
    hash_token, AlgorithmPolicy, JwtCodec, RefreshTokenService, StaticKeyManager, TokenServiceConfig,
};
use tw_infra::database::{DatabasePool, PostgresTokenRepository, PostgresUserRepository};
use tw_shared::config::DatabaseConfig;

async fn pool() -> DatabasePool {
    let pool = DatabasePool::new(DatabaseConfig::from_env().with_max_connections(5))
        .await
        .expect("DATABASE_URL must point at a reachable database");
    pool.run_migrations().await.unwrap();
    pool
}

async fn insert_user(pool: &DatabasePool, active: bool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, is_active, permissions) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(active)
        .bind(vec!["profile:read".to_string()])
        .execute(pool.get_pool())
        .await
        .unwrap();
    id
}

fn record(user_id: Uuid, family_id: Uuid) -> RefreshTokenRecord {
    let now = Utc::now();
    RefreshTokenRecord::new(
        user_id,
        hash_token(&Uuid::new_v4().to_string()),
        family_id,
        now,
        now + Duration::days(30),
    )
}

fn service(pool: &DatabasePool) -> RefreshTokenService<PostgresTokenRepository, PostgresUserRepository> {
    let keys = StaticKeyManager::new().with_secret("default", "integration-test-secret-0123456789");
    let config = TokenServiceConfig::default().with_policy(AlgorithmPolicy::Hs256);

    RefreshTokenService::new(
        PostgresTokenRepository::new(pool.get_pool().clone()),
        PostgresUserRepository::new(pool.get_pool().clone()),
        JwtCodec::new(Arc::new(keys), config),
    )
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_save_and_find() {
    let pool = pool().await;
    let repo = PostgresTokenRepository::new(pool.get_pool().clone());

    let saved = repo.save(record(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();

    assert_eq!(repo.find_by_hash(&saved.token_hash).await.unwrap().as_ref(), Some(&saved));
    assert_eq!(repo.find_by_id(saved.id).await.unwrap().map(|r| r.id), Some(saved.id));
    assert!(repo.find_by_hash("missing").await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_duplicate_hash_is_integrity_error() {
    let pool = pool().await;
    let repo = PostgresTokenRepository::new(pool.get_pool().clone());

    let first = repo.save(record(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();
    let mut duplicate = record(Uuid::new_v4(), Uuid::new_v4());
    duplicate.token_hash = first.token_hash.clone();

    assert!(matches!(
        repo.save(duplicate).await,
        Err(DomainError::Storage(StorageError::Integrity { .. }))
    ));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_update_is_version_checked() {
    let pool = pool().await;
    let repo = PostgresTokenRepository::new(pool.get_pool().clone());

    let family_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let original = repo.save(record(user_id, family_id)).await.unwrap();
    let successor = repo.save(record(user_id, family_id)).await.unwrap();

    let mut rotated = original.clone();
    rotated.replaced_by = Some(successor.id);
    let updated = repo.update(rotated).await.unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.replaced_by, Some(successor.id));

    let mut stale = original;
    stale.revoked_at = Some(Utc::now());
    assert!(matches!(
        repo.update(stale).await,
        Err(DomainError::Storage(StorageError::Conflict { .. }))
    ));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_bulk_revocation() {
    let pool = pool().await;
    let repo = PostgresTokenRepository::new(pool.get_pool().clone());

    let user_id = Uuid::new_v4();
    let family_id = Uuid::new_v4();
    let a = repo.save(record(user_id, family_id)).await.unwrap();
    repo.save(record(user_id, family_id)).await.unwrap();
    repo.save(record(user_id, Uuid::new_v4())).await.unwrap();

    assert!(repo.revoke_by_hash(&a.token_hash, Utc::now()).await.unwrap());
    assert!(!repo.revoke_by_hash(&a.token_hash, Utc::now()).await.unwrap());

    // The already-revoked record keeps its timestamp
    assert_eq!(repo.revoke_family(family_id, Utc::now()).await.unwrap(), 1);
    assert_eq!(repo.count_active_by_user(user_id).await.unwrap(), 1);

    assert_eq!(repo.revoke_all_for_user(user_id, Utc::now()).await.unwrap(), 1);
    assert!(repo.find_active_by_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_migrations_create_users_table() {
    let pool = pool().await;

    let exists: bool = sqlx::query_scalar("SELECT to_regclass('public.users') IS NOT NULL")
        .fetch_one(pool.get_pool())
        .await
        .unwrap();
    assert!(exists);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_user_lookup() {
    let pool = pool().await;
    let users = PostgresUserRepository::new(pool.get_pool().clone());

    let id = insert_user(&pool, false).await;
    let user = users.find_by_id(id).await.unwrap().unwrap();

    assert!(!user.is_active);
    assert_eq!(user.permissions, vec!["profile:read".to_string()]);
    assert!(users.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_reuse_cascade_end_to_end() {
    let pool = pool().await;
    let service = service(&pool);
    let user_id = insert_user(&pool, true).await;

    let t1 = service.create_refresh_token(user_id).await.unwrap();
    let t2 = service.refresh_access_token(&t1).await.unwrap().refresh_token;
    let t3 = service.refresh_access_token(&t2).await.unwrap().refresh_token;

    assert!(matches!(
        service.refresh_access_token(&t1).await,
        Err(DomainError::Auth(AuthError::AuthenticationRequired))
    ));
    assert!(service.refresh_access_token(&t3).await.is_err());

    let repo = PostgresTokenRepository::new(pool.get_pool().clone());
    let family_id = repo.find_by_hash(&hash_token(&t1)).await.unwrap().unwrap().family_id;
    let family = repo.find_by_family(family_id).await.unwrap();
    assert_eq!(family.len(), 3);
    assert!(family.iter().all(|r| r.revoked_at.is_some()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires PostgreSQL
async fn test_concurrent_rotation_single_winner() {
    let pool = pool().await;
    let service = Arc::new(service(&pool));
    let user_id = insert_user(&pool, true).await;
    let token = service.create_refresh_token(user_id).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let token = token.clone();
            tokio::spawn(async move { service.refresh_access_token(&token).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
