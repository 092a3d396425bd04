//! Cost, revenue and monthly snapshot models.

use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `cost_entries` table.
#[derive(Debug, Clone, FromRow, Serialize, Validate)]
pub struct CostEntry {
    pub id: DbId,
    pub category: String,
    #[validate(range(min = 1, max = 100_000_000_000i64))]
    pub amount_cents: i64,
    pub incurred_on: Date,
    pub department: Option<String>,
    pub description: Option<String>,
    pub created_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCostEntry {
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(min = 1, max = 100_000_000_000i64))]
    pub amount_cents: i64,
    pub incurred_on: Date,
    pub department: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCostEntry {
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 100_000_000_000i64))]
    pub amount_cents: Option<i64>,
    pub incurred_on: Option<Date>,
    pub department: Option<String>,
    pub description: Option<String>,
}

/// A row from the `revenue_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RevenueEntry {
    pub id: DbId,
    pub source: String,
    pub amount_cents: i64,
    pub received_on: Date,
    pub description: Option<String>,
    pub created_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRevenueEntry {
    #[validate(length(min = 1, max = 100))]
    pub source: String,
    #[validate(range(min = 1, max = 100_000_000_000i64))]
    pub amount_cents: i64,
    pub received_on: Date,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateRevenueEntry {
    #[validate(length(min = 1, max = 100))]
    pub source: Option<String>,
    #[validate(range(min = 1, max = 100_000_000_000i64))]
    pub amount_cents: Option<i64>,
    pub received_on: Option<Date>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

/// Summary range; both bounds are inclusive.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryParams {
    pub from: Date,
    pub to: Date,
}

/// `(key, amount)` pair read for aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct AmountRow {
    pub key: String,
    pub amount_cents: i64,
}

/// A row from the `cost_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CostSnapshot {
    pub id: DbId,
    pub period: String,
    pub total_cost_cents: i64,
    pub total_revenue_cents: i64,
    pub net_cents: i64,
    pub margin_pct: f64,
    pub breakdown_json: serde_json::Value,
    pub created_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSnapshot {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotListParams {
    pub year: Option<i32>,
}

/// Values written by a snapshot upsert.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub period: String,
    pub total_cost_cents: i64,
    pub total_revenue_cents: i64,
    pub net_cents: i64,
    pub margin_pct: f64,
    pub breakdown_json: serde_json::Value,
    pub created_by_id: Option<DbId>,
}
