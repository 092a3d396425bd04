//! Shift definition and schedule entry models.

use chrono::NaiveTime;
use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `shifts` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Shift {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_working: bool,
    pub color: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShift {
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default = "default_true")]
    pub is_working: bool,
    #[validate(length(max = 16))]
    pub color: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateShift {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_working: Option<bool>,
    #[validate(length(max = 16))]
    pub color: Option<String>,
}

/// A row from the `schedule_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub work_date: Date,
    pub shift_code: String,
    pub period: String,
    pub note: Option<String>,
    pub created_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert-or-replace one (user, date, period) cell.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertEntry {
    pub user_id: DbId,
    pub work_date: Date,
    pub shift_code: String,
    pub period: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkUpsertEntries {
    #[validate(length(min = 1, max = 1000), nested)]
    pub entries: Vec<UpsertEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridQuery {
    pub year: i32,
    pub month: u32,
    pub department: Option<String>,
    pub position: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

/// Staff member listed as a grid row.
#[derive(Debug, Clone, FromRow)]
pub struct GridStaffRow {
    pub id: DbId,
    pub full_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
}
