//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for Tokenward,
//! following Clean Architecture principles. It provides concrete
//! implementations for the ports declared in `tw_core`.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: PostgreSQL token store and user lookup using SQLx
//! - **Vault**: HTTP client for a Vault KV v2 secret store
//! - **Keys**: key manager selection (file, vault, or auto-probing)
//! - **Telemetry**: tracing subscriber setup

// Re-export core types for convenience
pub use tw_core::errors::*;

/// Database module - PostgreSQL implementations using SQLx
pub mod database;

/// Secret store module - Vault KV v2 over HTTP
pub mod vault;

/// Key manager selection
pub mod keys;

/// Tracing subscriber setup
pub mod telemetry;

use std::sync::Arc;

use tw_core::services::token::{JwtCodec, KeyManager, PrincipalDecoder, RefreshTokenService, TokenServiceConfig};
use tw_shared::config::AppConfig;

use database::{DatabasePool, PostgresTokenRepository, PostgresUserRepository};

/// Refresh token service wired to PostgreSQL
pub type PgRefreshTokenService = RefreshTokenService<PostgresTokenRepository, PostgresUserRepository>;

/// Infrastructure service container
pub struct InfrastructureServices {
    pub config: AppConfig,
    pub database: DatabasePool,
    pub key_manager: Arc<dyn KeyManager>,
    pub refresh_tokens: PgRefreshTokenService,
    pub principals: PrincipalDecoder,
}

/// Initialize infrastructure services
///
/// This function sets up:
/// - Configuration from the environment (and `.env` if present)
/// - The database connection pool, with migrations applied
/// - The key manager selected by `KEY_STORE_PROVIDER`
/// - The refresh token service and principal decoder sharing one codec
///
/// Tracing is not installed here; call `telemetry::init_tracing` first.
pub async fn initialize() -> Result<InfrastructureServices, InfrastructureError> {
    tracing::info!("Initializing infrastructure services...");

    let config = load_config();

    let database = DatabasePool::new(config.database.clone()).await?;
    database.run_migrations().await?;

    let key_manager = keys::build_key_manager(&config.auth.key_store).await?;

    let token_config = TokenServiceConfig::from_jwt_config(&config.auth.jwt)
        .map_err(|e| InfrastructureError::Config(e.to_string()))?;
    let codec = JwtCodec::new(Arc::clone(&key_manager), token_config);

    let refresh_tokens = RefreshTokenService::new(
        PostgresTokenRepository::new(database.get_pool().clone()),
        PostgresUserRepository::new(database.get_pool().clone()),
        codec.clone(),
    );
    let principals = PrincipalDecoder::new(codec);

    tracing::info!("Infrastructure services initialized successfully");

    Ok(InfrastructureServices {
        config,
        database,
        key_manager,
        refresh_tokens,
        principals,
    })
}

/// Load configuration from environment
pub fn load_config() -> AppConfig {
    dotenvy::dotenv().ok(); // Load .env file if present
    AppConfig::from_env()
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable key store
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
