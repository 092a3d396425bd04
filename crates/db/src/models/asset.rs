//! Asset register, maintenance and fault report models.

use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub asset_tag: String,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub purchase_date: Option<Date>,
    pub purchase_cost_cents: Option<i64>,
    pub vendor_id: Option<DbId>,
    pub warranty_expires_on: Option<Date>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAsset {
    #[validate(length(min = 1, max = 64))]
    pub asset_tag: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub purchase_date: Option<Date>,
    #[validate(range(min = 0))]
    pub purchase_cost_cents: Option<i64>,
    pub vendor_id: Option<DbId>,
    pub warranty_expires_on: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAsset {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub purchase_date: Option<Date>,
    #[validate(range(min = 0))]
    pub purchase_cost_cents: Option<i64>,
    pub vendor_id: Option<DbId>,
    pub warranty_expires_on: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// A row from the `maintenance_schedules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MaintenanceSchedule {
    pub id: DbId,
    pub asset_id: DbId,
    pub title: String,
    pub interval_days: i32,
    pub last_performed_on: Option<Date>,
    pub next_due_on: Date,
    pub assigned_to_id: Option<DbId>,
    pub is_active: bool,
    pub last_reminded_on: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaintenanceSchedule {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub interval_days: i32,
    /// First due date; defaults to today plus the interval.
    pub next_due_on: Option<Date>,
    pub assigned_to_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CompleteMaintenance {
    /// Defaults to today.
    pub performed_on: Option<Date>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// A row from the `maintenance_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MaintenanceLog {
    pub id: DbId,
    pub schedule_id: Option<DbId>,
    pub asset_id: DbId,
    pub performed_on: Date,
    pub performed_by_id: Option<DbId>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// Active schedule due on or before a cutoff, joined with its asset.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DueMaintenance {
    pub schedule_id: DbId,
    pub asset_id: DbId,
    pub asset_tag: String,
    pub asset_name: String,
    pub title: String,
    pub next_due_on: Date,
    pub assigned_to_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DueParams {
    pub days: Option<i64>,
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// A row from the `fault_reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FaultReport {
    pub id: DbId,
    pub asset_id: DbId,
    pub reported_by_id: Option<DbId>,
    pub description: String,
    pub severity: String,
    pub status: String,
    pub resolution_note: Option<String>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFaultReport {
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub severity: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FaultStatusChange {
    pub status: String,
    #[validate(length(max = 2000))]
    pub resolution_note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}
