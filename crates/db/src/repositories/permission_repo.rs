//! Repository for `user_permissions` overrides and `permission_requests`.

use clinicops_core::pagination::Page;
use clinicops_core::permissions::{OverrideEffect, PermissionRequestStatus};
use clinicops_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::permission::{
    CreatePermissionRequest, PermissionRequest, PermissionRequestListParams, UpsertOverride,
    UserPermission,
};

const OVERRIDE_COLUMNS: &str = "id, user_id, permission, effect, reason, expires_at, \
                                granted_by_id, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, user_id, permission, reason, requested_days, status, \
                               reviewed_by_id, reviewed_at, review_note, created_at, updated_at";

/// `$1` user (NULL for all), `$2` status.
const REQUEST_FILTER: &str =
    "($1::BIGINT IS NULL OR user_id = $1) AND ($2::TEXT IS NULL OR status = $2)";

pub struct PermissionRepo;

impl PermissionRepo {
    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    /// All overrides of a user, active or expired.
    pub async fn overrides_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<UserPermission>, sqlx::Error> {
        let query = format!(
            "SELECT {OVERRIDE_COLUMNS} FROM user_permissions WHERE user_id = $1 ORDER BY permission"
        );
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_override(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<UserPermission>, sqlx::Error> {
        let query = format!("SELECT {OVERRIDE_COLUMNS} FROM user_permissions WHERE id = $1");
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the override for `(user_id, permission)`.
    pub async fn upsert_override(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertOverride,
        granted_by_id: DbId,
    ) -> Result<UserPermission, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_permissions (user_id, permission, effect, reason, expires_at, granted_by_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT uq_user_permissions_user_permission DO UPDATE SET
                effect = EXCLUDED.effect,
                reason = EXCLUDED.reason,
                expires_at = EXCLUDED.expires_at,
                granted_by_id = EXCLUDED.granted_by_id
             RETURNING {OVERRIDE_COLUMNS}"
        );
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(user_id)
            .bind(&input.permission)
            .bind(&input.effect)
            .bind(&input.reason)
            .bind(input.expires_at)
            .bind(granted_by_id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete_override(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove overrides whose `expires_at` has passed.
    pub async fn purge_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_permissions WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    pub async fn create_request(
        pool: &PgPool,
        user_id: DbId,
        input: &CreatePermissionRequest,
    ) -> Result<PermissionRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO permission_requests (user_id, permission, reason, requested_days)
             VALUES ($1, $2, $3, $4)
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, PermissionRequest>(&query)
            .bind(user_id)
            .bind(&input.permission)
            .bind(&input.reason)
            .bind(input.requested_days)
            .fetch_one(pool)
            .await
    }

    pub async fn find_request(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PermissionRequest>, sqlx::Error> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM permission_requests WHERE id = $1");
        sqlx::query_as::<_, PermissionRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user already has a pending request for `permission`.
    pub async fn has_pending_request(
        pool: &PgPool,
        user_id: DbId,
        permission: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM permission_requests
                            WHERE user_id = $1 AND permission = $2 AND status = 'pending')",
        )
        .bind(user_id)
        .bind(permission)
        .fetch_one(pool)
        .await
    }

    /// List requests. `user_id = None` lists everyone's.
    pub async fn list_requests(
        pool: &PgPool,
        user_id: Option<DbId>,
        params: &PermissionRequestListParams,
        page: Page,
    ) -> Result<Vec<PermissionRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM permission_requests WHERE {REQUEST_FILTER}
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PermissionRequest>(&query)
            .bind(user_id)
            .bind(&params.status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_requests(
        pool: &PgPool,
        user_id: Option<DbId>,
        params: &PermissionRequestListParams,
    ) -> Result<i64, sqlx::Error> {
        let query =
            format!("SELECT COUNT(*)::BIGINT FROM permission_requests WHERE {REQUEST_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(user_id)
            .bind(&params.status)
            .fetch_one(pool)
            .await
    }

    /// Review a pending request. Approval also upserts a grant override in
    /// the same transaction. Returns `None` when the request is no longer
    /// pending.
    pub async fn review_request(
        pool: &PgPool,
        id: DbId,
        status: PermissionRequestStatus,
        reviewer_id: DbId,
        note: Option<&str>,
        grant_expires_at: Option<Timestamp>,
    ) -> Result<Option<PermissionRequest>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE permission_requests SET
                status = $2, reviewed_by_id = $3, reviewed_at = NOW(), review_note = $4
             WHERE id = $1 AND status = 'pending'
             RETURNING {REQUEST_COLUMNS}"
        );
        let request = sqlx::query_as::<_, PermissionRequest>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(note)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(request) = request else {
            return Ok(None);
        };

        if status == PermissionRequestStatus::Approved {
            sqlx::query(
                "INSERT INTO user_permissions (user_id, permission, effect, reason, expires_at, granted_by_id)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT ON CONSTRAINT uq_user_permissions_user_permission DO UPDATE SET
                    effect = EXCLUDED.effect,
                    reason = EXCLUDED.reason,
                    expires_at = EXCLUDED.expires_at,
                    granted_by_id = EXCLUDED.granted_by_id",
            )
            .bind(request.user_id)
            .bind(&request.permission)
            .bind(OverrideEffect::Grant.as_str())
            .bind(&request.reason)
            .bind(grant_expires_at)
            .bind(reviewer_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(request))
    }
}
