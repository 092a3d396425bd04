//! Permission-based access control.
//!
//! Routes are gated on the caller's effective permission set, resolved per
//! request from their position, role and active overrides via
//! [`Permissions::load`].

use std::collections::BTreeSet;

use chrono::Utc;
use clinicops_core::error::CoreError;
use clinicops_core::permissions::effective_permissions;
use clinicops_core::roles::{Position, Role};
use clinicops_core::types::DbId;
use clinicops_db::models::user::User;
use clinicops_db::repositories::{PermissionRepo, UserRepo};
use clinicops_db::DbPool;

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The caller's resolved permission set.
#[derive(Debug, Clone)]
pub struct Permissions {
    pub user_id: DbId,
    granted: BTreeSet<String>,
}

impl Permissions {
    /// Resolve the effective permissions of `auth`.
    ///
    /// A deactivated or deleted account resolves to 403 even while its
    /// access token is still unexpired.
    pub async fn load(pool: &DbPool, auth: &AuthUser) -> AppResult<Self> {
        let (_, granted) = resolve_for_user(pool, auth.user_id).await?;
        Ok(Self {
            user_id: auth.user_id,
            granted,
        })
    }

    pub fn has(&self, permission: &str) -> bool {
        self.granted.contains(permission)
    }

    /// 403 unless the permission is held.
    pub fn require(&self, permission: &str) -> AppResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Missing permission: {permission}"
            )))
        }
    }
}

/// Load an active user and compute their effective permission set.
pub async fn resolve_for_user(
    pool: &DbPool,
    user_id: DbId,
) -> AppResult<(User, BTreeSet<String>)> {
    let user = UserRepo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }
    let granted = effective_for(pool, &user).await?;
    Ok((user, granted))
}

/// Effective permissions of `user` as of now, whether or not the account
/// is active.
pub async fn effective_for(pool: &DbPool, user: &User) -> AppResult<BTreeSet<String>> {
    let role = Role::parse(&user.role)?;
    let position = user.position.as_deref().map(Position::parse).transpose()?;
    let overrides: Vec<_> = PermissionRepo::overrides_for_user(pool, user.id)
        .await?
        .iter()
        .filter_map(|o| o.to_override())
        .collect();

    Ok(effective_permissions(role, position, &overrides, Utc::now()))
}

/// Shorthand for handlers that need exactly one permission.
pub async fn require_permission(
    state: &AppState,
    auth: &AuthUser,
    permission: &str,
) -> AppResult<Permissions> {
    let perms = Permissions::load(&state.pool, auth).await?;
    perms.require(permission)?;
    Ok(perms)
}
