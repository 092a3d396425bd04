//! Repository for incidents and complaints.

use clinicops_core::pagination::Page;
use clinicops_core::quality::{ComplaintStatus, IncidentStatus};
use clinicops_core::types::{DbId, Timestamp};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::quality::{
    Complaint, ComplaintListParams, CountRow, CreateComplaint, CreateIncident, Incident,
    IncidentListParams, UpdateComplaint, UpdateIncident,
};

const INCIDENT_COLUMNS: &str = "id, title, description, category, severity, status, occurred_at, \
                                location, reported_by_id, assigned_to_id, root_cause, \
                                corrective_action, handover_id, resolved_at, created_at, updated_at";

const COMPLAINT_COLUMNS: &str = "id, complainant_name, contact, channel, description, status, \
                                 response, handled_by_id, resolved_at, created_at, updated_at";

/// `$1` status, `$2` severity.
const INCIDENT_FILTER: &str =
    "($1::TEXT IS NULL OR status = $1) AND ($2::TEXT IS NULL OR severity = $2)";

/// `$1` lower bound, `$2` upper bound (exclusive).
const RANGE_FILTER: &str = "($1::TIMESTAMPTZ IS NULL OR {col} >= $1) \
                            AND ($2::TIMESTAMPTZ IS NULL OR {col} < $2)";

fn range_filter(col: &str) -> String {
    RANGE_FILTER.replace("{col}", col)
}

pub struct QualityRepo;

impl QualityRepo {
    // -----------------------------------------------------------------------
    // Incidents
    // -----------------------------------------------------------------------

    /// Insert an incident inside the caller's transaction so an escalation
    /// handover can be created atomically alongside it.
    pub async fn create_incident(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateIncident,
        reported_by_id: DbId,
    ) -> Result<Incident, sqlx::Error> {
        let query = format!(
            "INSERT INTO incidents
                (title, description, category, severity, occurred_at, location,
                 reported_by_id, assigned_to_id)
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW()), $6, $7, $8)
             RETURNING {INCIDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.severity)
            .bind(input.occurred_at)
            .bind(&input.location)
            .bind(reported_by_id)
            .bind(input.assigned_to_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Attach `handover_id` to an incident that has none yet.
    ///
    /// Returns `None` when the incident is missing or already linked. The
    /// row lock taken by the update serializes concurrent callers, so only
    /// the first one to commit gets `Some`.
    pub async fn link_handover(
        tx: &mut Transaction<'_, Postgres>,
        incident_id: DbId,
        handover_id: DbId,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET handover_id = $2
             WHERE id = $1 AND handover_id IS NULL
             RETURNING {INCIDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(incident_id)
            .bind(handover_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn find_incident(pool: &PgPool, id: DbId) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1");
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_incidents(
        pool: &PgPool,
        params: &IncidentListParams,
        page: Page,
    ) -> Result<Vec<Incident>, sqlx::Error> {
        let query = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE {INCIDENT_FILTER}
             ORDER BY occurred_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(&params.status)
            .bind(&params.severity)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_incidents(
        pool: &PgPool,
        params: &IncidentListParams,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM incidents WHERE {INCIDENT_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(&params.severity)
            .fetch_one(pool)
            .await
    }

    pub async fn update_incident(
        pool: &PgPool,
        id: DbId,
        input: &UpdateIncident,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                severity = COALESCE($5, severity),
                location = COALESCE($6, location),
                assigned_to_id = COALESCE($7, assigned_to_id),
                root_cause = COALESCE($8, root_cause),
                corrective_action = COALESCE($9, corrective_action)
             WHERE id = $1
             RETURNING {INCIDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.severity)
            .bind(&input.location)
            .bind(input.assigned_to_id)
            .bind(&input.root_cause)
            .bind(&input.corrective_action)
            .fetch_optional(pool)
            .await
    }

    /// Move an incident from `from` to `to`. `resolved_at` is stamped on
    /// resolve and cleared on reopen. Returns `None` if the row is no longer
    /// in `from`.
    pub async fn set_incident_status(
        pool: &PgPool,
        id: DbId,
        from: IncidentStatus,
        to: IncidentStatus,
        corrective_action: Option<&str>,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET
                status = $3,
                corrective_action = COALESCE($4, corrective_action),
                resolved_at = CASE
                    WHEN $3 = 'resolved' THEN NOW()
                    WHEN $3 = 'investigating' THEN NULL
                    ELSE resolved_at
                END
             WHERE id = $1 AND status = $2
             RETURNING {INCIDENT_COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(corrective_action)
            .fetch_optional(pool)
            .await
    }

    pub async fn incidents_by_severity(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<CountRow>, sqlx::Error> {
        Self::count_by(pool, "incidents", "severity", "occurred_at", from, to).await
    }

    pub async fn incidents_by_status(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<CountRow>, sqlx::Error> {
        Self::count_by(pool, "incidents", "status", "occurred_at", from, to).await
    }

    // -----------------------------------------------------------------------
    // Complaints
    // -----------------------------------------------------------------------

    pub async fn create_complaint(
        pool: &PgPool,
        input: &CreateComplaint,
    ) -> Result<Complaint, sqlx::Error> {
        let query = format!(
            "INSERT INTO complaints (complainant_name, contact, channel, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {COMPLAINT_COLUMNS}"
        );
        sqlx::query_as::<_, Complaint>(&query)
            .bind(&input.complainant_name)
            .bind(&input.contact)
            .bind(&input.channel)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_complaint(pool: &PgPool, id: DbId) -> Result<Option<Complaint>, sqlx::Error> {
        let query = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1");
        sqlx::query_as::<_, Complaint>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_complaints(
        pool: &PgPool,
        params: &ComplaintListParams,
        page: Page,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        let query = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Complaint>(&query)
            .bind(&params.status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_complaints(
        pool: &PgPool,
        params: &ComplaintListParams,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM complaints WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(&params.status)
        .fetch_one(pool)
        .await
    }

    /// Patch a complaint. A status change records the handler.
    pub async fn update_complaint(
        pool: &PgPool,
        id: DbId,
        input: &UpdateComplaint,
        handled_by_id: DbId,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let query = format!(
            "UPDATE complaints SET
                contact = COALESCE($2, contact),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                response = COALESCE($5, response),
                handled_by_id = CASE WHEN $4::TEXT IS NULL THEN handled_by_id ELSE $6 END,
                resolved_at = CASE
                    WHEN $4 = 'resolved' THEN COALESCE(resolved_at, NOW())
                    WHEN $4::TEXT IS NULL THEN resolved_at
                    ELSE NULL
                END
             WHERE id = $1
             RETURNING {COMPLAINT_COLUMNS}"
        );
        sqlx::query_as::<_, Complaint>(&query)
            .bind(id)
            .bind(&input.contact)
            .bind(&input.description)
            .bind(&input.status)
            .bind(&input.response)
            .bind(handled_by_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve an open or in-review complaint. Returns `None` if it is
    /// already resolved.
    pub async fn resolve_complaint(
        pool: &PgPool,
        id: DbId,
        response: &str,
        handled_by_id: DbId,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let query = format!(
            "UPDATE complaints SET
                status = $2,
                response = $3,
                handled_by_id = $4,
                resolved_at = NOW()
             WHERE id = $1 AND status <> $2
             RETURNING {COMPLAINT_COLUMNS}"
        );
        sqlx::query_as::<_, Complaint>(&query)
            .bind(id)
            .bind(ComplaintStatus::Resolved.as_str())
            .bind(response)
            .bind(handled_by_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn complaints_by_status(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<CountRow>, sqlx::Error> {
        Self::count_by(pool, "complaints", "status", "created_at", from, to).await
    }

    pub async fn complaints_by_channel(
        pool: &PgPool,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<CountRow>, sqlx::Error> {
        Self::count_by(pool, "complaints", "channel", "created_at", from, to).await
    }

    /// `GROUP BY key_col` count over a time range. Identifiers are
    /// compile-time constants from the callers above.
    async fn count_by(
        pool: &PgPool,
        table: &str,
        key_col: &str,
        time_col: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<CountRow>, sqlx::Error> {
        let filter = range_filter(time_col);
        let query = format!(
            "SELECT {key_col} AS key, COUNT(*)::BIGINT AS count FROM {table}
             WHERE {filter}
             GROUP BY {key_col} ORDER BY {key_col}"
        );
        sqlx::query_as::<_, CountRow>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}
