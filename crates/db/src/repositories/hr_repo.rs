//! Repository for certifications, leave requests and skills.

use clinicops_core::hr::{LeaveStatus, BLOCKING_LEAVE_STATUSES};
use clinicops_core::pagination::Page;
use clinicops_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::hr::{
    Certification, CreateCertification, CreateLeaveRequest, CreateSkill, ExpiringCertification,
    LeaveListParams, LeaveRequest, LeaveSummaryRow, SkillListParams, SkillMatrixRow,
    UpdateCertification, UserSkill,
};

const CERT_COLUMNS: &str = "id, user_id, name, issuer, license_number, issued_on, expires_on, \
                            created_at, updated_at";

const LEAVE_COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, days, reason, status, \
                             reviewed_by_id, reviewed_at, review_note, created_at, updated_at";

const SKILL_COLUMNS: &str = "id, user_id, skill, level, verified_by_id, created_at, updated_at";

/// `$1` status, `$2` user.
const LEAVE_FILTER: &str =
    "($1::TEXT IS NULL OR status = $1) AND ($2::BIGINT IS NULL OR user_id = $2)";

pub struct HrRepo;

impl HrRepo {
    // -----------------------------------------------------------------------
    // Certifications
    // -----------------------------------------------------------------------

    pub async fn create_certification(
        pool: &PgPool,
        input: &CreateCertification,
    ) -> Result<Certification, sqlx::Error> {
        let query = format!(
            "INSERT INTO certifications (user_id, name, issuer, license_number, issued_on, expires_on)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {CERT_COLUMNS}"
        );
        sqlx::query_as::<_, Certification>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.issuer)
            .bind(&input.license_number)
            .bind(input.issued_on)
            .bind(input.expires_on)
            .fetch_one(pool)
            .await
    }

    pub async fn find_certification(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Certification>, sqlx::Error> {
        let query = format!("SELECT {CERT_COLUMNS} FROM certifications WHERE id = $1");
        sqlx::query_as::<_, Certification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Certifications, soonest expiry first. `user_id = None` lists everyone's.
    pub async fn list_certifications(
        pool: &PgPool,
        user_id: Option<DbId>,
    ) -> Result<Vec<Certification>, sqlx::Error> {
        let query = format!(
            "SELECT {CERT_COLUMNS} FROM certifications
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
             ORDER BY expires_on NULLS LAST, id"
        );
        sqlx::query_as::<_, Certification>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Certifications with an expiry on or before `cutoff` (expired ones included).
    pub async fn certifications_expiring_before(
        pool: &PgPool,
        cutoff: Date,
    ) -> Result<Vec<Certification>, sqlx::Error> {
        let query = format!(
            "SELECT {CERT_COLUMNS} FROM certifications
             WHERE expires_on IS NOT NULL AND expires_on <= $1
             ORDER BY expires_on, id"
        );
        sqlx::query_as::<_, Certification>(&query)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    pub async fn update_certification(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCertification,
    ) -> Result<Option<Certification>, sqlx::Error> {
        let query = format!(
            "UPDATE certifications SET
                name = COALESCE($2, name),
                issuer = COALESCE($3, issuer),
                license_number = COALESCE($4, license_number),
                issued_on = COALESCE($5, issued_on),
                expires_on = COALESCE($6, expires_on)
             WHERE id = $1
             RETURNING {CERT_COLUMNS}"
        );
        sqlx::query_as::<_, Certification>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.issuer)
            .bind(&input.license_number)
            .bind(input.issued_on)
            .bind(input.expires_on)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_certification(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM certifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Certifications of active users expiring in `[today, cutoff]` that
    /// have not been reminded for their current expiry date.
    pub async fn certifications_due_for_reminder(
        pool: &PgPool,
        today: Date,
        cutoff: Date,
    ) -> Result<Vec<ExpiringCertification>, sqlx::Error> {
        sqlx::query_as::<_, ExpiringCertification>(
            "SELECT c.id, c.user_id, c.name, c.expires_on
             FROM certifications c
             JOIN users u ON u.id = c.user_id
             WHERE u.is_active
               AND c.expires_on BETWEEN $1 AND $2
               AND c.last_reminded_on IS DISTINCT FROM c.expires_on
             ORDER BY c.expires_on, c.id",
        )
        .bind(today)
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Record that a certification was reminded for `expires_on`.
    pub async fn mark_certification_reminded(
        pool: &PgPool,
        id: DbId,
        expires_on: Date,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE certifications SET last_reminded_on = $2 WHERE id = $1")
            .bind(id)
            .bind(expires_on)
            .execute(pool)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Leave
    // -----------------------------------------------------------------------

    pub async fn create_leave(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateLeaveRequest,
        days: i32,
    ) -> Result<LeaveRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO leave_requests (user_id, leave_type, start_date, end_date, days, reason)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {LEAVE_COLUMNS}"
        );
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(user_id)
            .bind(&input.leave_type)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(days)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    pub async fn find_leave(pool: &PgPool, id: DbId) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let query = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = $1");
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user has pending or approved leave overlapping `[start, end]`.
    pub async fn has_overlapping_leave(
        pool: &PgPool,
        user_id: DbId,
        start: Date,
        end: Date,
    ) -> Result<bool, sqlx::Error> {
        let statuses: Vec<String> = BLOCKING_LEAVE_STATUSES.iter().map(|s| s.to_string()).collect();
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM leave_requests
                WHERE user_id = $1 AND status = ANY($2)
                  AND start_date <= $4 AND end_date >= $3
             )",
        )
        .bind(user_id)
        .bind(&statuses)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
    }

    pub async fn list_leave(
        pool: &PgPool,
        params: &LeaveListParams,
        user_id: Option<DbId>,
        page: Page,
    ) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE {LEAVE_FILTER}
             ORDER BY start_date DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(&params.status)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_leave(
        pool: &PgPool,
        params: &LeaveListParams,
        user_id: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM leave_requests WHERE {LEAVE_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Close a pending request. Returns `None` if it is no longer pending.
    pub async fn close_leave(
        pool: &PgPool,
        id: DbId,
        status: LeaveStatus,
        reviewer_id: Option<DbId>,
        note: Option<&str>,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE leave_requests SET
                status = $2,
                reviewed_by_id = $3,
                reviewed_at = CASE WHEN $3::BIGINT IS NULL THEN NULL ELSE NOW() END,
                review_note = $4
             WHERE id = $1 AND status = 'pending'
             RETURNING {LEAVE_COLUMNS}"
        );
        sqlx::query_as::<_, LeaveRequest>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(note)
            .fetch_optional(pool)
            .await
    }

    /// Approved leave per type, counting requests that start in `year`.
    pub async fn leave_summary(
        pool: &PgPool,
        user_id: DbId,
        year: i32,
    ) -> Result<Vec<LeaveSummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, LeaveSummaryRow>(
            "SELECT leave_type, COUNT(*)::BIGINT AS requests, COALESCE(SUM(days), 0)::BIGINT AS days
             FROM leave_requests
             WHERE user_id = $1 AND status = 'approved'
               AND EXTRACT(YEAR FROM start_date)::INT = $2
             GROUP BY leave_type
             ORDER BY leave_type",
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Skills
    // -----------------------------------------------------------------------

    pub async fn create_skill(
        pool: &PgPool,
        input: &CreateSkill,
        skill: &str,
    ) -> Result<UserSkill, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_skills (user_id, skill, level) VALUES ($1, $2, $3)
             RETURNING {SKILL_COLUMNS}"
        );
        sqlx::query_as::<_, UserSkill>(&query)
            .bind(input.user_id)
            .bind(skill)
            .bind(input.level)
            .fetch_one(pool)
            .await
    }

    pub async fn find_skill(pool: &PgPool, id: DbId) -> Result<Option<UserSkill>, sqlx::Error> {
        let query = format!("SELECT {SKILL_COLUMNS} FROM user_skills WHERE id = $1");
        sqlx::query_as::<_, UserSkill>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_skills(
        pool: &PgPool,
        params: &SkillListParams,
    ) -> Result<Vec<UserSkill>, sqlx::Error> {
        let query = format!(
            "SELECT {SKILL_COLUMNS} FROM user_skills
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR skill = LOWER(TRIM($2)))
             ORDER BY skill, level DESC, id"
        );
        sqlx::query_as::<_, UserSkill>(&query)
            .bind(params.user_id)
            .bind(&params.skill)
            .fetch_all(pool)
            .await
    }

    /// Change the level and, when `verified_by_id` is given, record the verifier.
    pub async fn update_skill(
        pool: &PgPool,
        id: DbId,
        level: Option<i16>,
        verified_by_id: Option<DbId>,
    ) -> Result<Option<UserSkill>, sqlx::Error> {
        let query = format!(
            "UPDATE user_skills SET
                level = COALESCE($2, level),
                verified_by_id = COALESCE($3, verified_by_id)
             WHERE id = $1
             RETURNING {SKILL_COLUMNS}"
        );
        sqlx::query_as::<_, UserSkill>(&query)
            .bind(id)
            .bind(level)
            .bind(verified_by_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_skill(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_skills WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every (skill, active user) pair, grouped by skill.
    pub async fn skill_matrix(pool: &PgPool) -> Result<Vec<SkillMatrixRow>, sqlx::Error> {
        sqlx::query_as::<_, SkillMatrixRow>(
            "SELECT s.skill, s.user_id, u.full_name, s.level,
                    (s.verified_by_id IS NOT NULL) AS verified
             FROM user_skills s
             JOIN users u ON u.id = s.user_id
             WHERE u.is_active
             ORDER BY s.skill, s.level DESC, u.full_name",
        )
        .fetch_all(pool)
        .await
    }
}
