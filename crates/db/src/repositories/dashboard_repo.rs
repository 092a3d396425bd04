//! Clinic-wide dashboard counters.

use clinicops_core::types::Date;
use sqlx::PgPool;

use crate::models::dashboard::DashboardCounts;

pub struct DashboardRepo;

impl DashboardRepo {
    /// All counters in one round-trip. `maintenance_cutoff` bounds the
    /// due-maintenance window; the month bounds are inclusive.
    pub async fn counts(
        pool: &PgPool,
        maintenance_cutoff: Date,
        month_start: Date,
        month_end: Date,
    ) -> Result<DashboardCounts, sqlx::Error> {
        sqlx::query_as::<_, DashboardCounts>(
            "SELECT
                (SELECT COUNT(*) FROM handovers
                  WHERE deleted_at IS NULL AND status IN ('open', 'in_progress'))::BIGINT
                  AS open_handovers,
                (SELECT COUNT(*) FROM handovers
                  WHERE deleted_at IS NULL AND status IN ('open', 'in_progress')
                    AND priority = 'urgent')::BIGINT
                  AS urgent_handovers,
                (SELECT COUNT(*) FROM inventory_items
                  WHERE is_active AND quantity <= min_quantity)::BIGINT
                  AS low_stock_items,
                (SELECT COUNT(*) FROM leave_requests WHERE status = 'pending')::BIGINT
                  AS pending_leave_requests,
                (SELECT COUNT(*) FROM incidents
                  WHERE status IN ('reported', 'investigating'))::BIGINT
                  AS open_incidents,
                (SELECT COUNT(*) FROM maintenance_schedules m
                  JOIN assets a ON a.id = m.asset_id
                  WHERE m.is_active AND a.status <> 'retired' AND m.next_due_on <= $1)::BIGINT
                  AS maintenance_due,
                (SELECT COUNT(*) FROM fault_reports WHERE status <> 'resolved')::BIGINT
                  AS open_faults,
                (SELECT COUNT(*) FROM purchase_requests WHERE status = 'pending')::BIGINT
                  AS pending_purchase_requests,
                (SELECT COALESCE(SUM(amount_cents), 0) FROM cost_entries
                  WHERE incurred_on BETWEEN $2 AND $3)::BIGINT
                  AS month_cost_cents,
                (SELECT COALESCE(SUM(amount_cents), 0) FROM revenue_entries
                  WHERE received_on BETWEEN $2 AND $3)::BIGINT
                  AS month_revenue_cents",
        )
        .bind(maintenance_cutoff)
        .bind(month_start)
        .bind(month_end)
        .fetch_one(pool)
        .await
    }
}
