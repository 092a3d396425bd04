//! Handlers for the audit trail (`/audit-logs`). Both endpoints require
//! `audit.view`.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::export::{opt, ExportFormat, Table};
use clinicops_core::permissions::AUDIT_VIEW;
use clinicops_db::models::audit::{AuditFilter, AuditLog};
use clinicops_db::repositories::AuditLogRepo;
use serde_json::json;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::export;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::query::{FormatParams, PaginationParams};
use crate::response::PaginatedResponse;
use crate::state::AppState;

/// GET /api/audit-logs
///
/// Filtered, paginated entries, newest first.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<AuditFilter>,
    Query(paging): Query<PaginationParams>,
) -> AppResult<Json<PaginatedResponse<AuditLog>>> {
    require_permission(&state, &auth, AUDIT_VIEW).await?;
    check_filter(&filter)?;

    let page = paging.page();
    let logs = AuditLogRepo::query(&state.pool, &filter, page).await?;
    let total = AuditLogRepo::count(&state.pool, &filter).await?;
    Ok(Json(PaginatedResponse::new(logs, page, total)))
}

/// GET /api/audit-logs/export
///
/// Every entry matching the same filters as the listing, oldest first.
/// CSV by default; `?format=xlsx` for a workbook.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<AuditFilter>,
    Query(format): Query<FormatParams>,
) -> AppResult<Response> {
    require_permission(&state, &auth, AUDIT_VIEW).await?;
    check_filter(&filter)?;
    let format = ExportFormat::from_query(format.format.as_deref())?;

    let logs = AuditLogRepo::export(&state.pool, &filter).await?;

    let mut table = Table::new([
        "id",
        "created_at",
        "user_id",
        "actor_email",
        "action",
        "entity_type",
        "entity_id",
        "ip_address",
        "details",
    ]);
    for log in &logs {
        table.push(vec![
            log.id.to_string(),
            log.created_at.to_rfc3339(),
            opt(log.user_id),
            log.actor_email.clone().unwrap_or_default(),
            log.action.clone(),
            log.entity_type.clone(),
            opt(log.entity_id),
            log.ip_address.clone().unwrap_or_default(),
            log.details_json
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ]);
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::EXPORT,
        entities::AUDIT_LOG,
        None,
        Some(json!({
            "rows": logs.len(),
            "from": filter.from,
            "to": filter.to,
            "format": format.extension(),
        })),
    )
    .await;

    export::respond(format, "audit-logs", &table)
}

fn check_filter(filter: &AuditFilter) -> AppResult<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
    }
    Ok(())
}
