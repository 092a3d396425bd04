//! Repository for assets, maintenance schedules/logs and fault reports.

use clinicops_core::assets::AssetStatus;
use clinicops_core::pagination::Page;
use clinicops_core::types::{Date, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::asset::{
    Asset, AssetListParams, CreateAsset, CreateFaultReport, CreateMaintenanceSchedule,
    DueMaintenance, FaultReport, MaintenanceLog, MaintenanceSchedule, UpdateAsset,
};

const ASSET_COLUMNS: &str = "\
    id, asset_tag, name, category, location, status, purchase_date, \
    purchase_cost_cents, vendor_id, warranty_expires_on, notes, \
    created_at, updated_at";

const SCHEDULE_COLUMNS: &str = "\
    id, asset_id, title, interval_days, last_performed_on, next_due_on, \
    assigned_to_id, is_active, last_reminded_on, created_at, updated_at";

const LOG_COLUMNS: &str = "id, schedule_id, asset_id, performed_on, performed_by_id, notes, created_at";

const FAULT_COLUMNS: &str = "\
    id, asset_id, reported_by_id, description, severity, status, \
    resolution_note, resolved_at, created_at, updated_at";

/// `$1` status, `$2` category, `$3` search.
const ASSET_FILTER: &str = "($1::TEXT IS NULL OR status = $1) \
     AND ($2::TEXT IS NULL OR category = $2) \
     AND ($3::TEXT IS NULL OR name ILIKE '%' || $3 || '%' OR asset_tag ILIKE '%' || $3 || '%')";

pub struct AssetRepo;

impl AssetRepo {
    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    pub async fn create(pool: &PgPool, input: &CreateAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (\
                asset_tag, name, category, location, purchase_date, \
                purchase_cost_cents, vendor_id, warranty_expires_on, notes\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&input.asset_tag)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.location)
            .bind(input.purchase_date)
            .bind(input.purchase_cost_cents)
            .bind(input.vendor_id)
            .bind(input.warranty_expires_on)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &AssetListParams,
        page: Page,
    ) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE {ASSET_FILTER} \
             ORDER BY asset_tag LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&params.status)
            .bind(&params.category)
            .bind(&params.search)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &AssetListParams) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM assets WHERE {ASSET_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(&params.category)
            .bind(&params.search)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAsset,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets SET \
                name = COALESCE($2, name), \
                category = COALESCE($3, category), \
                location = COALESCE($4, location), \
                status = COALESCE($5, status), \
                purchase_date = COALESCE($6, purchase_date), \
                purchase_cost_cents = COALESCE($7, purchase_cost_cents), \
                vendor_id = COALESCE($8, vendor_id), \
                warranty_expires_on = COALESCE($9, warranty_expires_on), \
                notes = COALESCE($10, notes) \
             WHERE id = $1 \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.location)
            .bind(&input.status)
            .bind(input.purchase_date)
            .bind(input.purchase_cost_cents)
            .bind(input.vendor_id)
            .bind(input.warranty_expires_on)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Assets are retired rather than deleted; maintenance history is kept.
    pub async fn retire(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE assets SET status = 'retired' WHERE id = $1 AND status <> 'retired'")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set an asset's status inside the caller's transaction.
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: AssetStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE assets SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Lock an asset row for the remainder of the transaction.
    pub async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    pub async fn create_schedule(
        pool: &PgPool,
        asset_id: DbId,
        input: &CreateMaintenanceSchedule,
        next_due_on: Date,
    ) -> Result<MaintenanceSchedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO maintenance_schedules (asset_id, title, interval_days, next_due_on, assigned_to_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SCHEDULE_COLUMNS}"
        );
        sqlx::query_as::<_, MaintenanceSchedule>(&query)
            .bind(asset_id)
            .bind(&input.title)
            .bind(input.interval_days)
            .bind(next_due_on)
            .bind(input.assigned_to_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_schedule(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MaintenanceSchedule>, sqlx::Error> {
        let query = format!("SELECT {SCHEDULE_COLUMNS} FROM maintenance_schedules WHERE id = $1");
        sqlx::query_as::<_, MaintenanceSchedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn schedules_for_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<MaintenanceSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM maintenance_schedules \
             WHERE asset_id = $1 ORDER BY next_due_on, id"
        );
        sqlx::query_as::<_, MaintenanceSchedule>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    /// Record a completed maintenance: advance the schedule and append a
    /// log row in one transaction. Returns `None` if the schedule is gone.
    pub async fn complete_schedule(
        pool: &PgPool,
        id: DbId,
        performed_on: Date,
        next_due_on: Date,
        performed_by_id: DbId,
        notes: Option<&str>,
    ) -> Result<Option<(MaintenanceSchedule, MaintenanceLog)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE maintenance_schedules SET \
                last_performed_on = $2, next_due_on = $3, last_reminded_on = NULL \
             WHERE id = $1 \
             RETURNING {SCHEDULE_COLUMNS}"
        );
        let schedule = sqlx::query_as::<_, MaintenanceSchedule>(&query)
            .bind(id)
            .bind(performed_on)
            .bind(next_due_on)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(schedule) = schedule else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO maintenance_logs (schedule_id, asset_id, performed_on, performed_by_id, notes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {LOG_COLUMNS}"
        );
        let log = sqlx::query_as::<_, MaintenanceLog>(&query)
            .bind(schedule.id)
            .bind(schedule.asset_id)
            .bind(performed_on)
            .bind(performed_by_id)
            .bind(notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((schedule, log)))
    }

    pub async fn logs_for_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<MaintenanceLog>, sqlx::Error> {
        let query = format!(
            "SELECT {LOG_COLUMNS} FROM maintenance_logs \
             WHERE asset_id = $1 ORDER BY performed_on DESC, id DESC"
        );
        sqlx::query_as::<_, MaintenanceLog>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    /// Active schedules due on or before `cutoff`, on assets not retired.
    pub async fn due_maintenance(
        pool: &PgPool,
        cutoff: Date,
    ) -> Result<Vec<DueMaintenance>, sqlx::Error> {
        sqlx::query_as::<_, DueMaintenance>(
            "SELECT m.id AS schedule_id, a.id AS asset_id, a.asset_tag, a.name AS asset_name, \
                    m.title, m.next_due_on, m.assigned_to_id \
             FROM maintenance_schedules m \
             JOIN assets a ON a.id = m.asset_id \
             WHERE m.is_active AND a.status <> 'retired' AND m.next_due_on <= $1 \
             ORDER BY m.next_due_on, m.id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Due schedules not yet reminded for their current due date.
    pub async fn maintenance_due_for_reminder(
        pool: &PgPool,
        cutoff: Date,
    ) -> Result<Vec<DueMaintenance>, sqlx::Error> {
        sqlx::query_as::<_, DueMaintenance>(
            "SELECT m.id AS schedule_id, a.id AS asset_id, a.asset_tag, a.name AS asset_name, \
                    m.title, m.next_due_on, m.assigned_to_id \
             FROM maintenance_schedules m \
             JOIN assets a ON a.id = m.asset_id \
             WHERE m.is_active AND a.status <> 'retired' AND m.next_due_on <= $1 \
               AND m.last_reminded_on IS DISTINCT FROM m.next_due_on \
             ORDER BY m.next_due_on, m.id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Record that a schedule was reminded for `due_on`.
    pub async fn mark_schedule_reminded(
        pool: &PgPool,
        id: DbId,
        due_on: Date,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE maintenance_schedules SET last_reminded_on = $2 WHERE id = $1")
            .bind(id)
            .bind(due_on)
            .execute(pool)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Faults
    // -----------------------------------------------------------------------

    /// File a fault and, when given, move the asset to `new_asset_status`
    /// in the same transaction.
    pub async fn report_fault(
        tx: &mut Transaction<'_, Postgres>,
        asset_id: DbId,
        reported_by_id: DbId,
        input: &CreateFaultReport,
        new_asset_status: Option<AssetStatus>,
    ) -> Result<FaultReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO fault_reports (asset_id, reported_by_id, description, severity) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {FAULT_COLUMNS}"
        );
        let fault = sqlx::query_as::<_, FaultReport>(&query)
            .bind(asset_id)
            .bind(reported_by_id)
            .bind(&input.description)
            .bind(&input.severity)
            .fetch_one(&mut **tx)
            .await?;

        if let Some(status) = new_asset_status {
            Self::set_status(tx, asset_id, status).await?;
        }
        Ok(fault)
    }

    pub async fn find_fault(pool: &PgPool, id: DbId) -> Result<Option<FaultReport>, sqlx::Error> {
        let query = format!("SELECT {FAULT_COLUMNS} FROM fault_reports WHERE id = $1");
        sqlx::query_as::<_, FaultReport>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lock_fault(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<FaultReport>, sqlx::Error> {
        let query = format!("SELECT {FAULT_COLUMNS} FROM fault_reports WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, FaultReport>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn faults_for_asset(
        pool: &PgPool,
        asset_id: DbId,
    ) -> Result<Vec<FaultReport>, sqlx::Error> {
        let query = format!(
            "SELECT {FAULT_COLUMNS} FROM fault_reports WHERE asset_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, FaultReport>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_faults(
        pool: &PgPool,
        status: Option<&str>,
        page: Page,
    ) -> Result<Vec<FaultReport>, sqlx::Error> {
        let query = format!(
            "SELECT {FAULT_COLUMNS} FROM fault_reports \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, FaultReport>(&query)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_faults(pool: &PgPool, status: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM fault_reports WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(pool)
        .await
    }

    /// Update a fault's status inside a transaction. Resolving stamps
    /// `resolved_at`; reopening clears it.
    pub async fn set_fault_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: &str,
        resolution_note: Option<&str>,
    ) -> Result<FaultReport, sqlx::Error> {
        let query = format!(
            "UPDATE fault_reports SET \
                status = $2, \
                resolution_note = COALESCE($3, resolution_note), \
                resolved_at = CASE WHEN $2 = 'resolved' THEN NOW() ELSE NULL END \
             WHERE id = $1 \
             RETURNING {FAULT_COLUMNS}"
        );
        sqlx::query_as::<_, FaultReport>(&query)
            .bind(id)
            .bind(status)
            .bind(resolution_note)
            .fetch_one(&mut **tx)
            .await
    }

    /// Open or in-progress faults remaining on an asset.
    pub async fn count_unresolved_faults(
        tx: &mut Transaction<'_, Postgres>,
        asset_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM fault_reports WHERE asset_id = $1 AND status <> 'resolved'",
        )
        .bind(asset_id)
        .fetch_one(&mut **tx)
        .await
    }
}
