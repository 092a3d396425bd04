//! Best-effort audit trail recording for mutating handlers.

use clinicops_core::audit::{entities, redact_sensitive_fields};
use clinicops_core::types::DbId;
use clinicops_db::models::audit::CreateAuditLog;
use clinicops_db::repositories::AuditLogRepo;

use crate::middleware::auth::ClientInfo;
use crate::state::AppState;

/// Append an audit entry. Failures are logged and swallowed so that an
/// audit outage never fails the request that triggered it.
pub async fn record(
    state: &AppState,
    user_id: Option<DbId>,
    action: &str,
    entity_type: &str,
    entity_id: Option<DbId>,
    details: Option<serde_json::Value>,
) {
    write(
        state,
        CreateAuditLog {
            user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details_json: details.as_ref().map(redact_sensitive_fields),
            ip_address: None,
        },
    )
    .await;
}

/// Sign-in events on `user_id`'s account, with the client address.
pub async fn record_sign_in(
    state: &AppState,
    client: &ClientInfo,
    user_id: DbId,
    action: &str,
    details: Option<serde_json::Value>,
) {
    write(
        state,
        CreateAuditLog {
            user_id: Some(user_id),
            action: action.to_string(),
            entity_type: entities::USER.to_string(),
            entity_id: Some(user_id),
            details_json: details.as_ref().map(redact_sensitive_fields),
            ip_address: client.ip_address.clone(),
        },
    )
    .await;
}

async fn write(state: &AppState, input: CreateAuditLog) {
    if let Err(e) = AuditLogRepo::create(&state.pool, &input).await {
        tracing::warn!(
            error = %e,
            action = %input.action,
            entity_type = %input.entity_type,
            entity_id = ?input.entity_id,
            "Failed to write audit log entry"
        );
    }
}
