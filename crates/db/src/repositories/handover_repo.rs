//! Repository for `handovers` and `handover_comments`.
//!
//! Handovers are soft-deleted; every read filters `deleted_at IS NULL`.

use clinicops_core::handover::HandoverStatus;
use clinicops_core::pagination::Page;
use clinicops_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::handover::{
    CreateComment, CreateHandover, Handover, HandoverComment, HandoverListParams, UpdateHandover,
};

const COLUMNS: &str = "id, title, description, priority, status, shift, department, \
                       assignee_id, created_by_id, due_at, completed_at, source_incident_id, \
                       created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, handover_id, author_id, body, created_at";

/// `$1` status, `$2` priority, `$3` assignee, `$4` "mine" user id.
const LIST_FILTER: &str = "deleted_at IS NULL \
     AND ($1::TEXT IS NULL OR status = $1) \
     AND ($2::TEXT IS NULL OR priority = $2) \
     AND ($3::BIGINT IS NULL OR assignee_id = $3) \
     AND ($4::BIGINT IS NULL OR assignee_id = $4 OR created_by_id = $4)";

pub struct HandoverRepo;

impl HandoverRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateHandover,
        created_by_id: DbId,
    ) -> Result<Handover, sqlx::Error> {
        let query = format!(
            "INSERT INTO handovers
                (title, description, priority, shift, department, assignee_id, created_by_id, due_at)
             VALUES ($1, $2, COALESCE($3, 'medium'), $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.priority)
            .bind(&input.shift)
            .bind(&input.department)
            .bind(input.assignee_id)
            .bind(created_by_id)
            .bind(input.due_at)
            .fetch_one(pool)
            .await
    }

    /// Insert a handover spawned from an incident, inside the caller's transaction.
    pub async fn create_from_incident(
        tx: &mut Transaction<'_, Postgres>,
        title: &str,
        description: &str,
        priority: &str,
        assignee_id: Option<DbId>,
        created_by_id: DbId,
        incident_id: DbId,
    ) -> Result<Handover, sqlx::Error> {
        let query = format!(
            "INSERT INTO handovers
                (title, description, priority, assignee_id, created_by_id, source_incident_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(title)
            .bind(description)
            .bind(priority)
            .bind(assignee_id)
            .bind(created_by_id)
            .bind(incident_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Handover>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM handovers WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Open handovers first, then by priority and due date.
    pub async fn list(
        pool: &PgPool,
        params: &HandoverListParams,
        mine: Option<DbId>,
        page: Page,
    ) -> Result<Vec<Handover>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM handovers WHERE {LIST_FILTER}
             ORDER BY
                CASE status WHEN 'open' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END,
                CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
                due_at NULLS LAST,
                created_at DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(&params.status)
            .bind(&params.priority)
            .bind(params.assignee_id)
            .bind(mine)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        params: &HandoverListParams,
        mine: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM handovers WHERE {LIST_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(&params.priority)
            .bind(params.assignee_id)
            .bind(mine)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateHandover,
    ) -> Result<Option<Handover>, sqlx::Error> {
        let query = format!(
            "UPDATE handovers SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                shift = COALESCE($5, shift),
                department = COALESCE($6, department),
                assignee_id = COALESCE($7, assignee_id),
                due_at = COALESCE($8, due_at)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.priority)
            .bind(&input.shift)
            .bind(&input.department)
            .bind(input.assignee_id)
            .bind(input.due_at)
            .fetch_optional(pool)
            .await
    }

    /// Move to `to`, guarded by the expected current status so concurrent
    /// changes do not both apply. Sets `completed_at` when moving to done.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        from: HandoverStatus,
        to: HandoverStatus,
    ) -> Result<Option<Handover>, sqlx::Error> {
        let query = format!(
            "UPDATE handovers SET
                status = $3,
                completed_at = CASE WHEN $3 = 'done' THEN NOW() ELSE NULL END
             WHERE id = $1 AND status = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Handover>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE handovers SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    pub async fn add_comment(
        pool: &PgPool,
        handover_id: DbId,
        author_id: DbId,
        input: &CreateComment,
    ) -> Result<HandoverComment, sqlx::Error> {
        let query = format!(
            "INSERT INTO handover_comments (handover_id, author_id, body)
             VALUES ($1, $2, $3)
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, HandoverComment>(&query)
            .bind(handover_id)
            .bind(author_id)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    pub async fn list_comments(
        pool: &PgPool,
        handover_id: DbId,
    ) -> Result<Vec<HandoverComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM handover_comments
             WHERE handover_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, HandoverComment>(&query)
            .bind(handover_id)
            .fetch_all(pool)
            .await
    }
}
