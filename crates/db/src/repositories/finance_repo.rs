//! Repository for cost entries, revenue entries and monthly snapshots.

use clinicops_core::pagination::Page;
use clinicops_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::finance::{
    AmountRow, CostEntry, CostSnapshot, CreateCostEntry, CreateRevenueEntry, EntryListParams,
    NewSnapshot, RevenueEntry, UpdateCostEntry, UpdateRevenueEntry,
};

const COST_COLUMNS: &str = "id, category, amount_cents, incurred_on, department, description, \
                            created_by_id, created_at, updated_at";

const REVENUE_COLUMNS: &str =
    "id, source, amount_cents, received_on, description, created_by_id, created_at, updated_at";

const SNAPSHOT_COLUMNS: &str = "id, period, total_cost_cents, total_revenue_cents, net_cents, \
                                margin_pct, breakdown_json, created_by_id, created_at, updated_at";

pub struct FinanceRepo;

impl FinanceRepo {
    // -----------------------------------------------------------------------
    // Costs
    // -----------------------------------------------------------------------

    pub async fn create_cost(
        pool: &PgPool,
        input: &CreateCostEntry,
        created_by_id: DbId,
    ) -> Result<CostEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO cost_entries (category, amount_cents, incurred_on, department, description, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COST_COLUMNS}"
        );
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(&input.category)
            .bind(input.amount_cents)
            .bind(input.incurred_on)
            .bind(&input.department)
            .bind(&input.description)
            .bind(created_by_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_cost(pool: &PgPool, id: DbId) -> Result<Option<CostEntry>, sqlx::Error> {
        let query = format!("SELECT {COST_COLUMNS} FROM cost_entries WHERE id = $1");
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_costs(
        pool: &PgPool,
        params: &EntryListParams,
        page: Page,
    ) -> Result<Vec<CostEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COST_COLUMNS} FROM cost_entries
             WHERE ($1::DATE IS NULL OR incurred_on >= $1) AND ($2::DATE IS NULL OR incurred_on <= $2)
             ORDER BY incurred_on DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(params.from)
            .bind(params.to)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_costs(pool: &PgPool, params: &EntryListParams) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM cost_entries
             WHERE ($1::DATE IS NULL OR incurred_on >= $1) AND ($2::DATE IS NULL OR incurred_on <= $2)",
        )
        .bind(params.from)
        .bind(params.to)
        .fetch_one(pool)
        .await
    }

    pub async fn update_cost(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCostEntry,
    ) -> Result<Option<CostEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE cost_entries SET
                category = COALESCE($2, category),
                amount_cents = COALESCE($3, amount_cents),
                incurred_on = COALESCE($4, incurred_on),
                department = COALESCE($5, department),
                description = COALESCE($6, description)
             WHERE id = $1
             RETURNING {COST_COLUMNS}"
        );
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(id)
            .bind(&input.category)
            .bind(input.amount_cents)
            .bind(input.incurred_on)
            .bind(&input.department)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_cost(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cost_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `(category, amount)` for every cost in `[from, to]`.
    pub async fn cost_amounts(
        pool: &PgPool,
        from: Date,
        to: Date,
    ) -> Result<Vec<AmountRow>, sqlx::Error> {
        sqlx::query_as::<_, AmountRow>(
            "SELECT category AS key, amount_cents FROM cost_entries
             WHERE incurred_on BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Revenue
    // -----------------------------------------------------------------------

    pub async fn create_revenue(
        pool: &PgPool,
        input: &CreateRevenueEntry,
        created_by_id: DbId,
    ) -> Result<RevenueEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO revenue_entries (source, amount_cents, received_on, description, created_by_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REVENUE_COLUMNS}"
        );
        sqlx::query_as::<_, RevenueEntry>(&query)
            .bind(&input.source)
            .bind(input.amount_cents)
            .bind(input.received_on)
            .bind(&input.description)
            .bind(created_by_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_revenue(pool: &PgPool, id: DbId) -> Result<Option<RevenueEntry>, sqlx::Error> {
        let query = format!("SELECT {REVENUE_COLUMNS} FROM revenue_entries WHERE id = $1");
        sqlx::query_as::<_, RevenueEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_revenue(
        pool: &PgPool,
        params: &EntryListParams,
        page: Page,
    ) -> Result<Vec<RevenueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {REVENUE_COLUMNS} FROM revenue_entries
             WHERE ($1::DATE IS NULL OR received_on >= $1) AND ($2::DATE IS NULL OR received_on <= $2)
             ORDER BY received_on DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, RevenueEntry>(&query)
            .bind(params.from)
            .bind(params.to)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_revenue(pool: &PgPool, params: &EntryListParams) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM revenue_entries
             WHERE ($1::DATE IS NULL OR received_on >= $1) AND ($2::DATE IS NULL OR received_on <= $2)",
        )
        .bind(params.from)
        .bind(params.to)
        .fetch_one(pool)
        .await
    }

    pub async fn update_revenue(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRevenueEntry,
    ) -> Result<Option<RevenueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE revenue_entries SET
                source = COALESCE($2, source),
                amount_cents = COALESCE($3, amount_cents),
                received_on = COALESCE($4, received_on),
                description = COALESCE($5, description)
             WHERE id = $1
             RETURNING {REVENUE_COLUMNS}"
        );
        sqlx::query_as::<_, RevenueEntry>(&query)
            .bind(id)
            .bind(&input.source)
            .bind(input.amount_cents)
            .bind(input.received_on)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_revenue(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revenue_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `(source, amount)` for every revenue entry in `[from, to]`.
    pub async fn revenue_amounts(
        pool: &PgPool,
        from: Date,
        to: Date,
    ) -> Result<Vec<AmountRow>, sqlx::Error> {
        sqlx::query_as::<_, AmountRow>(
            "SELECT source AS key, amount_cents FROM revenue_entries
             WHERE received_on BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Insert or overwrite the snapshot for `snapshot.period`.
    pub async fn upsert_snapshot(
        pool: &PgPool,
        snapshot: &NewSnapshot,
    ) -> Result<CostSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO cost_snapshots
                (period, total_cost_cents, total_revenue_cents, net_cents, margin_pct,
                 breakdown_json, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT ON CONSTRAINT uq_cost_snapshots_period DO UPDATE SET
                total_cost_cents = EXCLUDED.total_cost_cents,
                total_revenue_cents = EXCLUDED.total_revenue_cents,
                net_cents = EXCLUDED.net_cents,
                margin_pct = EXCLUDED.margin_pct,
                breakdown_json = EXCLUDED.breakdown_json,
                created_by_id = EXCLUDED.created_by_id
             RETURNING {SNAPSHOT_COLUMNS}"
        );
        sqlx::query_as::<_, CostSnapshot>(&query)
            .bind(&snapshot.period)
            .bind(snapshot.total_cost_cents)
            .bind(snapshot.total_revenue_cents)
            .bind(snapshot.net_cents)
            .bind(snapshot.margin_pct)
            .bind(&snapshot.breakdown_json)
            .bind(snapshot.created_by_id)
            .fetch_one(pool)
            .await
    }

    /// Snapshots newest first, optionally limited to one year (`YYYY-` prefix).
    pub async fn list_snapshots(
        pool: &PgPool,
        year: Option<i32>,
    ) -> Result<Vec<CostSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM cost_snapshots
             WHERE ($1::TEXT IS NULL OR period LIKE $1 || '-%')
             ORDER BY period DESC"
        );
        sqlx::query_as::<_, CostSnapshot>(&query)
            .bind(year.map(|y| format!("{y:04}")))
            .fetch_all(pool)
            .await
    }
}
