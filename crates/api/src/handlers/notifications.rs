//! Handlers for the caller's in-app notifications (`/notifications`).
//!
//! Every endpoint is scoped to the authenticated user; another user's
//! notification id behaves as not found.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinicops_core::pagination::Page;
use clinicops_core::types::DbId;
use clinicops_db::models::notification::{Notification, NotificationListParams};
use clinicops_db::repositories::NotificationRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let page = Page::new(params.page, params.limit);
    let rows =
        NotificationRepo::list_for_user(&state.pool, auth.user_id, params.unread_only, page)
            .await?;
    let total =
        NotificationRepo::count_for_user(&state.pool, auth.user_id, params.unread_only).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let unread = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { unread },
    }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = NotificationRepo::mark_read(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Notification", id))?;
    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: MarkedRead { updated },
    }))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::delete(&state.pool, id, auth.user_id).await? {
        return Err(AppError::not_found("Notification", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
