//! Incident and complaint models.

use clinicops_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `incidents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Incident {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub severity: String,
    pub status: String,
    pub occurred_at: Timestamp,
    pub location: Option<String>,
    pub reported_by_id: Option<DbId>,
    pub assigned_to_id: Option<DbId>,
    pub root_cause: Option<String>,
    pub corrective_action: Option<String>,
    pub handover_id: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIncident {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub category: Option<String>,
    pub severity: String,
    pub occurred_at: Option<Timestamp>,
    pub location: Option<String>,
    pub assigned_to_id: Option<DbId>,
}

/// Patch DTO. Status goes through the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateIncident {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub location: Option<String>,
    pub assigned_to_id: Option<DbId>,
    pub root_cause: Option<String>,
    pub corrective_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentStatusChange {
    pub status: String,
    /// May be supplied together with a move to `resolved`.
    pub corrective_action: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub severity: Option<String>,
}

/// A row from the `complaints` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Complaint {
    pub id: DbId,
    pub complainant_name: String,
    pub contact: Option<String>,
    pub channel: String,
    pub description: String,
    pub status: String,
    pub response: Option<String>,
    pub handled_by_id: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComplaint {
    #[validate(length(min = 1, max = 200))]
    pub complainant_name: String,
    pub contact: Option<String>,
    pub channel: String,
    #[validate(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateComplaint {
    pub contact: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveComplaint {
    #[validate(length(min = 1))]
    pub response: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

/// `(key, count)` aggregate row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsParams {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
