//! Staff accounts: lookups, admin edits, lockout bookkeeping and the id
//! lists the notification router resolves audiences with.

use clinicops_core::pagination::Page;
use clinicops_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{CreateUser, DirectoryEntry, UpdateUser, User, UserListParams};

const COLUMNS: &str = "id, email, password_hash, full_name, role, position, department, phone, \
                       is_active, last_login_at, failed_login_count, locked_until, \
                       created_at, updated_at";

/// Filter shared by `list` and `count`. `$1` role, `$2` position, `$3` search,
/// `$4` include inactive.
const LIST_FILTER: &str = "($1::TEXT IS NULL OR role = $1) \
     AND ($2::TEXT IS NULL OR position = $2) \
     AND ($3::TEXT IS NULL OR full_name ILIKE '%' || $3 || '%' OR email ILIKE '%' || $3 || '%') \
     AND ($4 OR is_active)";

pub struct UserRepo;

impl UserRepo {
    /// `email` must already be normalized to lowercase.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, full_name, role, position, department, phone)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.full_name)
            .bind(&input.role)
            .bind(&input.position)
            .bind(&input.department)
            .bind(&input.phone)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive, inactive accounts included.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Ordered by name.
    pub async fn list(
        pool: &PgPool,
        params: &UserListParams,
        page: Page,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE {LIST_FILTER}
             ORDER BY full_name, id
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&params.role)
            .bind(&params.position)
            .bind(&params.search)
            .bind(params.include_inactive)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &UserListParams) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM users WHERE {LIST_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.role)
            .bind(&params.position)
            .bind(&params.search)
            .bind(params.include_inactive)
            .fetch_one(pool)
            .await
    }

    /// Count all users, active or not. Used by the first-admin bootstrap.
    pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(pool)
            .await
    }

    /// Active users for assignment pickers.
    pub async fn directory(pool: &PgPool) -> Result<Vec<DirectoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, DirectoryEntry>(
            "SELECT id, full_name, position, department FROM users
             WHERE is_active ORDER BY full_name, id",
        )
        .fetch_all(pool)
        .await
    }

    /// IDs of active users holding any of `roles`.
    pub async fn active_ids_by_roles(
        pool: &PgPool,
        roles: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM users WHERE is_active AND role = ANY($1) ORDER BY id",
        )
        .bind(roles)
        .fetch_all(pool)
        .await
    }

    /// IDs of every active user.
    pub async fn active_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM users WHERE is_active ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Partial update; `None` fields keep their value.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                position = COALESCE($5, position),
                department = COALESCE($6, department),
                phone = COALESCE($7, phone),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(&input.role)
            .bind(&input.position)
            .bind(&input.department)
            .bind(&input.phone)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// False when the user is unknown or already inactive.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = false WHERE id = $1 AND is_active = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a wrong password. Once the count reaches `max_attempts` the
    /// account is locked until `lock_until`. Returns the new count and the
    /// lock, if one is in force.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_until: Timestamp,
    ) -> Result<(i32, Option<Timestamp>), sqlx::Error> {
        sqlx::query_as::<_, (i32, Option<Timestamp>)>(
            "UPDATE users SET
                failed_login_count = failed_login_count + 1,
                locked_until = CASE WHEN failed_login_count + 1 >= $2 THEN $3 ELSE locked_until END
             WHERE id = $1
             RETURNING failed_login_count, locked_until",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(pool)
        .await
    }

    /// Clears the failure count and any lock, stamps `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// A new password also lifts any lockout.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
