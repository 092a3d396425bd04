//! Audit logging constants and utility functions.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and background jobs.

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known actions for audit log entries.
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const PASSWORD_CHANGE: &str = "password_change";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const STATUS_CHANGE: &str = "status_change";
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const CANCEL: &str = "cancel";
    pub const PUBLISH: &str = "publish";
    pub const EXPORT: &str = "export";
    pub const PERMISSION_CHANGE: &str = "permission_change";
    pub const STOCK_MOVEMENT: &str = "stock_movement";
    pub const RECEIVE: &str = "receive";
}

/// Entity type names recorded in `audit_logs.entity_type` and
/// `notifications.entity_type`.
pub mod entities {
    pub const USER: &str = "user";
    pub const AUDIT_LOG: &str = "audit_log";
    pub const PERMISSION_OVERRIDE: &str = "permission_override";
    pub const PERMISSION_REQUEST: &str = "permission_request";
    pub const HANDOVER: &str = "handover";
    pub const INVENTORY_CATEGORY: &str = "inventory_category";
    pub const INVENTORY_ITEM: &str = "inventory_item";
    pub const SHIFT: &str = "shift";
    pub const SCHEDULE_ENTRY: &str = "schedule_entry";
    pub const CERTIFICATION: &str = "certification";
    pub const LEAVE_REQUEST: &str = "leave_request";
    pub const SKILL: &str = "skill";
    pub const ASSET: &str = "asset";
    pub const MAINTENANCE_SCHEDULE: &str = "maintenance_schedule";
    pub const FAULT_REPORT: &str = "fault_report";
    pub const VENDOR: &str = "vendor";
    pub const PURCHASE_REQUEST: &str = "purchase_request";
    pub const PURCHASE_ORDER: &str = "purchase_order";
    pub const INCIDENT: &str = "incident";
    pub const COMPLAINT: &str = "complaint";
    pub const DOCUMENT: &str = "document";
    pub const ANNOUNCEMENT: &str = "announcement";
    pub const COST_ENTRY: &str = "cost_entry";
    pub const REVENUE_ENTRY: &str = "revenue_entry";
    pub const COST_SNAPSHOT: &str = "cost_snapshot";
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Fields that should be redacted from audit log details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "credential",
];

const REDACTED: &str = "[REDACTED]";

/// Redact sensitive fields from a JSON value.
///
/// Any object key containing one of [`SENSITIVE_FIELDS`] (case-insensitive)
/// has its value replaced with `"[REDACTED]"`. Nested objects and arrays are
/// walked recursively.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(key.clone(), serde_json::Value::String(REDACTED.into()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}
