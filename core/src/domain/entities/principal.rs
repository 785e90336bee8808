//! Authenticated principal derived from a validated token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::UserContext;

/// Who is calling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Service,
}

/// Immutable per-request principal
///
/// Permissions come from token claims only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub principal_type: PrincipalType,

    /// End user; for service principals, the delegated user if any
    pub user_id: Option<Uuid>,

    /// Calling service (service principals only)
    pub service_id: Option<String>,

    /// Permissions granted to the principal itself
    pub permissions: Vec<String>,

    /// Permissions of the delegated end user (service principals only)
    pub user_permissions: Vec<String>,
}

impl Principal {
    pub fn user(user_id: Uuid, permissions: Vec<String>) -> Self {
        Self {
            principal_type: PrincipalType::User,
            user_id: Some(user_id),
            service_id: None,
            permissions,
            user_permissions: Vec::new(),
        }
    }

    pub fn service(
        service_id: impl Into<String>,
        permissions: Vec<String>,
        user_context: Option<UserContext>,
    ) -> Self {
        let (user_id, user_permissions) = match user_context {
            Some(context) => (Some(context.user_id), context.permissions),
            None => (None, Vec::new()),
        };

        Self {
            principal_type: PrincipalType::Service,
            user_id,
            service_id: Some(service_id.into()),
            permissions,
            user_permissions,
        }
    }

    pub fn is_service(&self) -> bool {
        self.principal_type == PrincipalType::Service
    }

    /// Whether a service principal is acting for an end user
    pub fn is_delegated(&self) -> bool {
        self.is_service() && self.user_id.is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
