//! Database module - PostgreSQL implementations using SQLx
//!
//! This module provides database access layer implementations including:
//! - Connection pool management
//! - Repository implementations for refresh tokens and users
//! - Embedded schema migrations

pub mod connection;
pub mod postgres;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use postgres::{PostgresTokenRepository, PostgresUserRepository};
