//! Handlers for staff account administration (`/users`).
//!
//! Everything except the directory requires `user.manage`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::permissions::USER_MANAGE;
use clinicops_core::roles::{Position, Role};
use clinicops_core::types::DbId;
use clinicops_db::models::user::{CreateUser, DirectoryEntry, UpdateUser, User, UserListParams};
use clinicops_db::repositories::{SessionRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    pub role: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

fn validate_role_and_position(role: Option<&str>, position: Option<&str>) -> AppResult<()> {
    if let Some(role) = role {
        Role::parse(role)?;
    }
    if let Some(position) = position {
        Position::parse(position)?;
    }
    Ok(())
}

fn hash_new_password(password: &str) -> AppResult<String> {
    validate_password_strength(password, MIN_PASSWORD_LENGTH).map_err(AppError::validation)?;
    hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    require_permission(&state, &auth, USER_MANAGE).await?;
    let page = clinicops_core::pagination::Page::new(params.page, params.limit);
    let users = UserRepo::list(&state.pool, &params, page).await?;
    let total = UserRepo::count(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(users, page, total)))
}

/// GET /api/users/directory
///
/// Active staff for assignment pickers. Any authenticated user.
pub async fn directory(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<DirectoryEntry>>>> {
    let entries = UserRepo::directory(&state.pool).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    require_permission(&state, &auth, USER_MANAGE).await?;
    input.validate()?;
    validate_role_and_position(Some(&input.role), input.position.as_deref())?;

    let password_hash = hash_new_password(&input.password)?;
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email.trim().to_lowercase(),
            password_hash,
            full_name: input.full_name,
            role: input.role,
            position: input.position,
            department: input.department,
            phone: input.phone,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = auth.user_id, "User created");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::USER,
        Some(user.id),
        Some(json!({ "email": user.email, "role": user.role, "position": user.position })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    if auth.user_id != id {
        require_permission(&state, &auth, USER_MANAGE).await?;
    }
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    Ok(Json(DataResponse { data: user }))
}

/// PATCH /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateUser>,
) -> AppResult<Json<DataResponse<User>>> {
    require_permission(&state, &auth, USER_MANAGE).await?;
    input.validate()?;
    validate_role_and_position(input.role.as_deref(), input.position.as_deref())?;

    if id == auth.user_id && input.is_active == Some(false) {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }
    if let Some(email) = input.email.as_mut() {
        *email = email.trim().to_lowercase();
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::USER,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: user }))
}

/// DELETE /api/users/{id}
///
/// Soft-deactivates the account and revokes its sessions.
pub async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, USER_MANAGE).await?;
    if id == auth.user_id {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }

    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    tracing::info!(user_id = id, deactivated_by = auth.user_id, "User deactivated");
    audit::record(&state, Some(auth.user_id), actions::DELETE, entities::USER, Some(id), None)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, USER_MANAGE).await?;
    let hash = hash_new_password(&input.new_password)?;

    if !UserRepo::update_password(&state.pool, id, &hash).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::PASSWORD_CHANGE,
        entities::USER,
        Some(id),
        Some(json!({ "reset_by_admin": true })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
