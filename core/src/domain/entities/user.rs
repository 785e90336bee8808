//! Read-only user view needed to resolve the owner of a refresh token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User as seen by the token subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// Disabled users cannot refresh or sign in
    pub is_active: bool,

    /// Permissions minted into the user's access tokens
    pub permissions: Vec<String>,
}

impl User {
    /// Creates an active user with the given permissions
    pub fn new(id: Uuid, permissions: Vec<String>) -> Self {
        Self {
            id,
            is_active: true,
            permissions,
        }
    }

    /// Disables the account
    pub fn disable(&mut self) {
        self.is_active = false;
    }
}
