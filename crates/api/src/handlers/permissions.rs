//! Handlers for the permission catalog, per-user overrides and
//! self-service permission requests.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::permissions::{
    position_matrix, validate_permission_key, OverrideEffect, PermissionRequestStatus,
    PositionDefaults, ALL_PERMISSIONS, PERMISSION_MANAGE,
};
use clinicops_core::roles::ROLE_ADMIN;
use clinicops_core::types::DbId;
use clinicops_db::models::permission::{
    CreatePermissionRequest, PermissionRequest, PermissionRequestListParams, UpsertOverride,
    UserPermission,
};
use clinicops_db::repositories::{PermissionRepo, UserRepo};
use clinicops_events::{Audience, ClinicEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{effective_for, require_permission, Permissions};
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PermissionCatalog {
    pub permissions: &'static [&'static str],
    pub positions: Vec<PositionDefaults>,
}

/// Effective permissions of one user plus the overrides behind them.
#[derive(Debug, Serialize)]
pub struct UserPermissionsView {
    pub user_id: DbId,
    pub role: String,
    pub position: Option<String>,
    pub effective: Vec<String>,
    pub overrides: Vec<UserPermission>,
}

#[derive(Debug, Deserialize)]
pub struct SetOverridesRequest {
    pub overrides: Vec<UpsertOverride>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

async fn load_view(state: &AppState, user_id: DbId) -> AppResult<UserPermissionsView> {
    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;
    let effective = effective_for(&state.pool, &user).await?;
    let overrides = PermissionRepo::overrides_for_user(&state.pool, user_id).await?;
    Ok(UserPermissionsView {
        user_id: user.id,
        role: user.role,
        position: user.position,
        effective: effective.into_iter().collect(),
        overrides,
    })
}

// ---------------------------------------------------------------------------
// Catalog and overrides
// ---------------------------------------------------------------------------

/// GET /api/permissions/catalog
pub async fn catalog(_auth: AuthUser) -> Json<DataResponse<PermissionCatalog>> {
    Json(DataResponse {
        data: PermissionCatalog {
            permissions: ALL_PERMISSIONS,
            positions: position_matrix(),
        },
    })
}

/// GET /api/permissions/users/{id}
///
/// Self, or `permission.manage`.
pub async fn user_permissions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserPermissionsView>>> {
    if auth.user_id != user_id {
        require_permission(&state, &auth, PERMISSION_MANAGE).await?;
    }
    let view = load_view(&state, user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/permissions/users/{id}/overrides
///
/// Upserts each override by `(user, permission)`.
pub async fn set_overrides(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<DbId>,
    Json(input): Json<SetOverridesRequest>,
) -> AppResult<Json<DataResponse<UserPermissionsView>>> {
    require_permission(&state, &auth, PERMISSION_MANAGE).await?;

    let now = Utc::now();
    for o in &input.overrides {
        validate_permission_key(&o.permission)?;
        OverrideEffect::parse(&o.effect)?;
        if o.expires_at.is_some_and(|at| at <= now) {
            return Err(AppError::validation(format!(
                "Override for '{}' expires in the past",
                o.permission
            )));
        }
    }
    if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
        return Err(AppError::not_found("User", user_id));
    }

    for o in &input.overrides {
        let row = PermissionRepo::upsert_override(&state.pool, user_id, o, auth.user_id).await?;
        audit::record(
            &state,
            Some(auth.user_id),
            actions::PERMISSION_CHANGE,
            entities::PERMISSION_OVERRIDE,
            Some(row.id),
            Some(json!({
                "user_id": user_id,
                "permission": row.permission,
                "effect": row.effect,
                "expires_at": row.expires_at,
            })),
        )
        .await;
    }

    tracing::info!(
        user_id,
        count = input.overrides.len(),
        changed_by = auth.user_id,
        "Permission overrides updated"
    );

    let view = load_view(&state, user_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/permissions/overrides/{id}
pub async fn delete_override(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, PERMISSION_MANAGE).await?;

    let existing = PermissionRepo::find_override(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PermissionOverride", id))?;
    PermissionRepo::delete_override(&state.pool, id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::PERMISSION_OVERRIDE,
        Some(id),
        Some(json!({ "user_id": existing.user_id, "permission": existing.permission })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// POST /api/permissions/requests
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreatePermissionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PermissionRequest>>)> {
    input.validate()?;
    validate_permission_key(&input.permission)?;

    let perms = Permissions::load(&state.pool, &auth).await?;
    if perms.has(&input.permission) {
        return Err(AppError::validation(format!(
            "You already hold '{}'",
            input.permission
        )));
    }
    if PermissionRepo::has_pending_request(&state.pool, auth.user_id, &input.permission).await? {
        return Err(AppError::conflict(format!(
            "A request for '{}' is already pending",
            input.permission
        )));
    }

    let request = PermissionRepo::create_request(&state.pool, auth.user_id, &input).await?;

    state.publish(
        ClinicEvent::new(
            event_types::PERMISSION_REQUEST_SUBMITTED,
            "Permission request",
            format!("Request for '{}': {}", request.permission, request.reason),
        )
        .with_source(entities::PERMISSION_REQUEST, request.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::roles(&[ROLE_ADMIN])),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::PERMISSION_REQUEST,
        Some(request.id),
        Some(json!({ "permission": request.permission })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/permissions/requests
///
/// Own requests, or everyone's with `permission.manage`.
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PermissionRequestListParams>,
) -> AppResult<Json<PaginatedResponse<PermissionRequest>>> {
    if let Some(status) = params.status.as_deref() {
        PermissionRequestStatus::parse(status)?;
    }
    let perms = Permissions::load(&state.pool, &auth).await?;
    let scope = (!perms.has(PERMISSION_MANAGE)).then_some(auth.user_id);

    let page = clinicops_core::pagination::Page::new(params.page, params.limit);
    let rows = PermissionRepo::list_requests(&state.pool, scope, &params, page).await?;
    let total = PermissionRepo::count_requests(&state.pool, scope, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/permissions/requests/{id}/approve
pub async fn approve_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<PermissionRequest>>> {
    review(state, auth, id, PermissionRequestStatus::Approved, body).await
}

/// POST /api/permissions/requests/{id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<PermissionRequest>>> {
    review(state, auth, id, PermissionRequestStatus::Rejected, body).await
}

async fn review(
    state: AppState,
    auth: AuthUser,
    id: DbId,
    decision: PermissionRequestStatus,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<PermissionRequest>>> {
    require_permission(&state, &auth, PERMISSION_MANAGE).await?;
    let note = body.and_then(|Json(b)| b.note);

    let existing = PermissionRepo::find_request(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PermissionRequest", id))?;
    if existing.user_id == auth.user_id {
        return Err(AppError::forbidden("You cannot review your own request"));
    }
    if PermissionRequestStatus::parse(&existing.status)? != PermissionRequestStatus::Pending {
        return Err(AppError::validation(format!(
            "Only pending requests can be reviewed (current: {})",
            existing.status
        )));
    }

    let grant_expires_at = existing
        .requested_days
        .map(|days| Utc::now() + chrono::Duration::days(i64::from(days)));

    let request = PermissionRepo::review_request(
        &state.pool,
        id,
        decision,
        auth.user_id,
        note.as_deref(),
        grant_expires_at,
    )
    .await?
    .ok_or_else(|| AppError::conflict("Request was reviewed concurrently"))?;

    state.publish(
        ClinicEvent::new(
            event_types::PERMISSION_REQUEST_REVIEWED,
            format!("Permission request {}", decision),
            format!("Your request for '{}' was {}", request.permission, decision),
        )
        .with_source(entities::PERMISSION_REQUEST, request.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::User(request.user_id)),
    );
    let action = match decision {
        PermissionRequestStatus::Approved => actions::APPROVE,
        _ => actions::REJECT,
    };
    audit::record(
        &state,
        Some(auth.user_id),
        action,
        entities::PERMISSION_REQUEST,
        Some(request.id),
        Some(json!({
            "user_id": request.user_id,
            "permission": request.permission,
            "grant_expires_at": grant_expires_at,
        })),
    )
    .await;

    Ok(Json(DataResponse { data: request }))
}
