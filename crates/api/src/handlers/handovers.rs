//! Handlers for shift handover tasks (`/handovers`).
//!
//! Reading and creating require `handover.view`. Editing, status changes
//! and deletion are open to the creator and the assignee, or to anyone
//! holding `handover.manage`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::handover::{
    validate_title, validate_transition, HandoverPriority, HandoverStatus, ShiftSlot,
};
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{HANDOVER_MANAGE, HANDOVER_VIEW};
use clinicops_core::types::DbId;
use clinicops_db::models::handover::{
    CreateComment, CreateHandover, Handover, HandoverComment, HandoverDetail,
    HandoverListParams, UpdateHandover,
};
use clinicops_db::repositories::{HandoverRepo, UserRepo};
use clinicops_events::{Audience, ClinicEvent};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_permission, Permissions};
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_handover(state: &AppState, id: DbId) -> AppResult<Handover> {
    HandoverRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Handover", id))
}

/// Creator, assignee or `handover.manage`.
fn ensure_can_modify(perms: &Permissions, handover: &Handover) -> AppResult<()> {
    let involved = handover.created_by_id == perms.user_id
        || handover.assignee_id == Some(perms.user_id);
    if involved || perms.has(HANDOVER_MANAGE) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the creator, the assignee or a handover manager can change this handover",
        ))
    }
}

fn validate_fields(
    priority: Option<&str>,
    shift: Option<&str>,
    title: Option<&str>,
) -> AppResult<()> {
    if let Some(priority) = priority {
        HandoverPriority::parse(priority)?;
    }
    if let Some(shift) = shift {
        ShiftSlot::parse(shift)?;
    }
    if let Some(title) = title {
        validate_title(title)?;
    }
    Ok(())
}

async fn ensure_active_assignee(state: &AppState, assignee_id: Option<DbId>) -> AppResult<()> {
    let Some(id) = assignee_id else {
        return Ok(());
    };
    match UserRepo::find_by_id(&state.pool, id).await? {
        Some(user) if user.is_active => Ok(()),
        _ => Err(AppError::validation(format!(
            "Assignee {id} is not an active user"
        ))),
    }
}

fn notify_assignee(state: &AppState, handover: &Handover, actor: DbId) {
    let Some(assignee_id) = handover.assignee_id else {
        return;
    };
    state.publish(
        ClinicEvent::new(
            event_types::HANDOVER_ASSIGNED,
            "Handover assigned to you",
            format!("[{}] {}", handover.priority, handover.title),
        )
        .with_source(entities::HANDOVER, handover.id)
        .with_actor(actor)
        .with_audience(Audience::User(assignee_id)),
    );
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/handovers
pub async fn list_handovers(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HandoverListParams>,
) -> AppResult<Json<PaginatedResponse<Handover>>> {
    require_permission(&state, &auth, HANDOVER_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        HandoverStatus::parse(status)?;
    }
    if let Some(priority) = params.priority.as_deref() {
        HandoverPriority::parse(priority)?;
    }

    let mine = params.mine.then_some(auth.user_id);
    let page = Page::new(params.page, params.limit);
    let rows = HandoverRepo::list(&state.pool, &params, mine, page).await?;
    let total = HandoverRepo::count(&state.pool, &params, mine).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/handovers
pub async fn create_handover(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateHandover>,
) -> AppResult<(StatusCode, Json<DataResponse<Handover>>)> {
    require_permission(&state, &auth, HANDOVER_VIEW).await?;
    input.validate()?;
    validate_fields(
        input.priority.as_deref(),
        input.shift.as_deref(),
        Some(&input.title),
    )?;
    ensure_active_assignee(&state, input.assignee_id).await?;

    let handover = HandoverRepo::create(&state.pool, &input, auth.user_id).await?;

    tracing::info!(handover_id = handover.id, user_id = auth.user_id, "Handover created");
    notify_assignee(&state, &handover, auth.user_id);
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::HANDOVER,
        Some(handover.id),
        Some(json!({ "title": handover.title, "assignee_id": handover.assignee_id })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: handover })))
}

/// GET /api/handovers/{id}
pub async fn get_handover(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<HandoverDetail>>> {
    require_permission(&state, &auth, HANDOVER_VIEW).await?;
    let handover = find_handover(&state, id).await?;
    let comments = HandoverRepo::list_comments(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: HandoverDetail { handover, comments },
    }))
}

/// PATCH /api/handovers/{id}
pub async fn update_handover(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateHandover>,
) -> AppResult<Json<DataResponse<Handover>>> {
    let perms = require_permission(&state, &auth, HANDOVER_VIEW).await?;
    input.validate()?;
    validate_fields(
        input.priority.as_deref(),
        input.shift.as_deref(),
        input.title.as_deref(),
    )?;

    let existing = find_handover(&state, id).await?;
    ensure_can_modify(&perms, &existing)?;
    if HandoverStatus::parse(&existing.status)?.is_terminal() {
        return Err(AppError::validation(format!(
            "Handover is {} and can no longer be edited",
            existing.status
        )));
    }
    ensure_active_assignee(&state, input.assignee_id).await?;

    let updated = HandoverRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Handover", id))?;

    if updated.assignee_id.is_some() && updated.assignee_id != existing.assignee_id {
        notify_assignee(&state, &updated, auth.user_id);
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::HANDOVER,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/handovers/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChange>,
) -> AppResult<Json<DataResponse<Handover>>> {
    let perms = require_permission(&state, &auth, HANDOVER_VIEW).await?;
    let to = HandoverStatus::parse(&input.status)?;

    let existing = find_handover(&state, id).await?;
    ensure_can_modify(&perms, &existing)?;
    let from = HandoverStatus::parse(&existing.status)?;
    validate_transition(from, to)?;

    let updated = HandoverRepo::set_status(&state.pool, id, from, to)
        .await?
        .ok_or_else(|| AppError::conflict("Handover status changed concurrently"))?;

    tracing::info!(handover_id = id, %from, %to, user_id = auth.user_id, "Handover status changed");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::STATUS_CHANGE,
        entities::HANDOVER,
        Some(id),
        Some(json!({ "from": from.as_str(), "to": to.as_str() })),
    )
    .await;

    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/handovers/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<DataResponse<HandoverComment>>)> {
    require_permission(&state, &auth, HANDOVER_VIEW).await?;
    input.validate()?;
    find_handover(&state, id).await?;

    let comment = HandoverRepo::add_comment(&state.pool, id, auth.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}

/// DELETE /api/handovers/{id}
///
/// Soft delete. Creator or `handover.manage`.
pub async fn delete_handover(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let perms = require_permission(&state, &auth, HANDOVER_VIEW).await?;
    let existing = find_handover(&state, id).await?;
    if existing.created_by_id != auth.user_id && !perms.has(HANDOVER_MANAGE) {
        return Err(AppError::forbidden(
            "Only the creator or a handover manager can delete this handover",
        ));
    }

    if !HandoverRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Handover", id));
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::HANDOVER,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
