//! Handover task models.

use clinicops_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `handovers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Handover {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub shift: Option<String>,
    pub department: Option<String>,
    pub assignee_id: Option<DbId>,
    pub created_by_id: DbId,
    pub due_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub source_incident_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHandover {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub shift: Option<String>,
    pub department: Option<String>,
    pub assignee_id: Option<DbId>,
    pub due_at: Option<Timestamp>,
}

/// Patch DTO. Status changes go through the dedicated status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateHandover {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub shift: Option<String>,
    pub department: Option<String>,
    pub assignee_id: Option<DbId>,
    pub due_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandoverListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee_id: Option<DbId>,
    /// Only handovers created by or assigned to the caller.
    #[serde(default)]
    pub mine: bool,
}

/// A row from the `handover_comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HandoverComment {
    pub id: DbId,
    pub handover_id: DbId,
    pub author_id: DbId,
    pub body: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComment {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

/// Handover with its comment thread, returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HandoverDetail {
    #[serde(flatten)]
    pub handover: Handover,
    pub comments: Vec<HandoverComment>,
}
