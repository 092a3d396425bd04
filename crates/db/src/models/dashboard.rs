//! Dashboard aggregate model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Clinic-wide counters, computed in a single query.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub open_handovers: i64,
    pub urgent_handovers: i64,
    pub low_stock_items: i64,
    pub pending_leave_requests: i64,
    pub open_incidents: i64,
    pub maintenance_due: i64,
    pub open_faults: i64,
    pub pending_purchase_requests: i64,
    pub month_cost_cents: i64,
    pub month_revenue_cents: i64,
}
