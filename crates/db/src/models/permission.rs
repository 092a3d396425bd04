//! Permission overrides and permission requests.

use clinicops_core::permissions::{OverrideEffect, PermissionOverride};
use clinicops_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `user_permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPermission {
    pub id: DbId,
    pub user_id: DbId,
    pub permission: String,
    pub effect: String,
    pub reason: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub granted_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserPermission {
    /// Convert to the resolver's input type. Rows with an unknown effect are skipped.
    pub fn to_override(&self) -> Option<PermissionOverride> {
        OverrideEffect::parse(&self.effect)
            .ok()
            .map(|effect| PermissionOverride {
                permission: self.permission.clone(),
                effect,
                expires_at: self.expires_at,
            })
    }
}

/// One override in a `PUT /permissions/users/{id}/overrides` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertOverride {
    pub permission: String,
    pub effect: String,
    pub reason: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// A row from the `permission_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PermissionRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub permission: String,
    pub reason: String,
    pub requested_days: Option<i32>,
    pub status: String,
    pub reviewed_by_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    pub permission: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    #[validate(range(min = 1, max = 365))]
    pub requested_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionRequestListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}
