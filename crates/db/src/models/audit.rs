//! Audit log models.

use clinicops_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An audit entry with the acting user's email resolved.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    /// `None` for system actions or when the user row is gone.
    pub actor_email: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub details_json: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateAuditLog {
    pub user_id: Option<DbId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub details_json: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

/// Filters shared by the audit listing and its export. Every field is
/// optional; set fields are combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub user_id: Option<DbId>,
    /// Substring match on the actor's email.
    pub actor_email: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
