//! Repository for shift definitions and schedule entries.

use clinicops_core::types::{Date, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::scheduling::{
    CreateShift, GridStaffRow, ScheduleEntry, Shift, UpdateShift, UpsertEntry,
};

const SHIFT_COLUMNS: &str = "id, code, name, start_time, end_time, is_working, color, \
                             created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, user_id, work_date, shift_code, period, note, created_by_id, \
                             created_at, updated_at";

pub struct ScheduleRepo;

impl ScheduleRepo {
    // -----------------------------------------------------------------------
    // Shifts
    // -----------------------------------------------------------------------

    pub async fn list_shifts(pool: &PgPool) -> Result<Vec<Shift>, sqlx::Error> {
        let query = format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY code");
        sqlx::query_as::<_, Shift>(&query).fetch_all(pool).await
    }

    pub async fn find_shift(pool: &PgPool, id: DbId) -> Result<Option<Shift>, sqlx::Error> {
        let query = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1");
        sqlx::query_as::<_, Shift>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_shift(pool: &PgPool, input: &CreateShift) -> Result<Shift, sqlx::Error> {
        let query = format!(
            "INSERT INTO shifts (code, name, start_time, end_time, is_working, color)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SHIFT_COLUMNS}"
        );
        sqlx::query_as::<_, Shift>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.is_working)
            .bind(&input.color)
            .fetch_one(pool)
            .await
    }

    pub async fn update_shift(
        pool: &PgPool,
        id: DbId,
        input: &UpdateShift,
    ) -> Result<Option<Shift>, sqlx::Error> {
        let query = format!(
            "UPDATE shifts SET
                name = COALESCE($2, name),
                start_time = COALESCE($3, start_time),
                end_time = COALESCE($4, end_time),
                is_working = COALESCE($5, is_working),
                color = COALESCE($6, color)
             WHERE id = $1
             RETURNING {SHIFT_COLUMNS}"
        );
        sqlx::query_as::<_, Shift>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.is_working)
            .bind(&input.color)
            .fetch_optional(pool)
            .await
    }

    /// Number of schedule entries that reference a shift code.
    pub async fn count_entries_with_code(pool: &PgPool, code: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM schedule_entries WHERE shift_code = $1",
        )
        .bind(code)
        .fetch_one(pool)
        .await
    }

    pub async fn delete_shift(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// Entries of one user on one date, inside the caller's transaction.
    /// The rows are locked so concurrent upserts on the same day serialize.
    pub async fn day_entries(
        tx: &mut Transaction<'_, Postgres>,
        user_id: DbId,
        work_date: Date,
    ) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule_entries
             WHERE user_id = $1 AND work_date = $2
             FOR UPDATE"
        );
        sqlx::query_as::<_, ScheduleEntry>(&query)
            .bind(user_id)
            .bind(work_date)
            .fetch_all(&mut **tx)
            .await
    }

    /// Type of the approved leave covering `work_date`, if any.
    pub async fn approved_leave_on(
        tx: &mut Transaction<'_, Postgres>,
        user_id: DbId,
        work_date: Date,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT leave_type FROM leave_requests
             WHERE user_id = $1 AND status = 'approved'
               AND start_date <= $2 AND end_date >= $2
             ORDER BY start_date
             LIMIT 1",
        )
        .bind(user_id)
        .bind(work_date)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Insert or replace the entry for `(user, date, period)`.
    pub async fn upsert_entry(
        tx: &mut Transaction<'_, Postgres>,
        input: &UpsertEntry,
        period: &str,
        created_by_id: DbId,
    ) -> Result<ScheduleEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedule_entries (user_id, work_date, shift_code, period, note, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT uq_schedule_entries_user_date_period DO UPDATE SET
                shift_code = EXCLUDED.shift_code,
                note = EXCLUDED.note,
                created_by_id = EXCLUDED.created_by_id
             RETURNING {ENTRY_COLUMNS}"
        );
        sqlx::query_as::<_, ScheduleEntry>(&query)
            .bind(input.user_id)
            .bind(input.work_date)
            .bind(&input.shift_code)
            .bind(period)
            .bind(&input.note)
            .bind(created_by_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_entry(pool: &PgPool, id: DbId) -> Result<Option<ScheduleEntry>, sqlx::Error> {
        let query = format!("SELECT {ENTRY_COLUMNS} FROM schedule_entries WHERE id = $1");
        sqlx::query_as::<_, ScheduleEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_entry(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM schedule_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One user's entries in an inclusive date range.
    pub async fn entries_for_user(
        pool: &PgPool,
        user_id: DbId,
        from: Date,
        to: Date,
    ) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule_entries
             WHERE user_id = $1 AND work_date BETWEEN $2 AND $3
             ORDER BY work_date, period"
        );
        sqlx::query_as::<_, ScheduleEntry>(&query)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Grid
    // -----------------------------------------------------------------------

    /// Active staff shown as grid rows, optionally filtered.
    pub async fn grid_staff(
        pool: &PgPool,
        department: Option<&str>,
        position: Option<&str>,
    ) -> Result<Vec<GridStaffRow>, sqlx::Error> {
        sqlx::query_as::<_, GridStaffRow>(
            "SELECT id, full_name, position, department FROM users
             WHERE is_active
               AND ($1::TEXT IS NULL OR department = $1)
               AND ($2::TEXT IS NULL OR position = $2)
             ORDER BY department NULLS LAST, full_name, id",
        )
        .bind(department)
        .bind(position)
        .fetch_all(pool)
        .await
    }

    /// Entries of the given users in an inclusive date range.
    pub async fn entries_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
        from: Date,
        to: Date,
    ) -> Result<Vec<ScheduleEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule_entries
             WHERE user_id = ANY($1) AND work_date BETWEEN $2 AND $3
             ORDER BY user_id, work_date, period"
        );
        sqlx::query_as::<_, ScheduleEntry>(&query)
            .bind(user_ids)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}
