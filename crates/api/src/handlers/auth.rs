//! Handlers for `/auth`: login, token refresh, logout, profile and the
//! caller's own refresh sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinicops_core::audit::{actions, entities};
use clinicops_core::types::{DbId, Timestamp};
use clinicops_db::models::session::{CreateSession, UserSession};
use clinicops_db::models::user::User;
use clinicops_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit;
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, ClientInfo};
use crate::middleware::rbac::resolve_for_user;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

/// `GET /auth/me` payload: the profile plus what the caller may do.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub permissions: Vec<String>,
}

/// One device the caller is signed in on.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: DbId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl From<UserSession> for SessionView {
    fn from(s: UserSession) -> Self {
        Self {
            id: s.id,
            user_agent: s.user_agent,
            ip_address: s.ip_address,
            created_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid email or password")
}

fn invalid_refresh_token() -> AppError {
    AppError::unauthorized("Invalid or expired refresh token")
}

/// POST /api/auth/login
///
/// Wrong passwords count toward the lockout policy; reaching the limit
/// locks the account for the configured time.
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = input.email.trim().to_lowercase();
    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }
    if user.locked_until.is_some_and(|until| until > Utc::now()) {
        return Err(AppError::forbidden(
            "Account is temporarily locked. Try again later.",
        ));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let policy = state.config.login;
        let (failures, locked_until) = UserRepo::record_failed_login(
            &state.pool,
            user.id,
            policy.max_failed_attempts,
            Utc::now() + chrono::Duration::minutes(policy.lockout_mins),
        )
        .await?;
        if let Some(until) = locked_until {
            tracing::warn!(user_id = user.id, failures, %until, "Account locked after failed logins");
        }
        audit::record_sign_in(
            &state,
            &client,
            user.id,
            actions::LOGIN_FAILED,
            Some(json!({ "failed_attempts": failures })),
        )
        .await;
        return Err(invalid_credentials());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    audit::record_sign_in(&state, &client, user.id, actions::LOGIN, None).await;

    let (refresh_token, session) = new_session(&state, user.id, client);
    SessionRepo::create(&state.pool, &session).await?;
    Ok(Json(auth_response(&state, user, refresh_token)?))
}

/// POST /api/auth/refresh
///
/// Rotates the session: the presented refresh token stops working.
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let current = SessionRepo::find_active_by_hash(
        &state.pool,
        &hash_refresh_token(input.refresh_token.trim()),
    )
    .await?
    .ok_or_else(invalid_refresh_token)?;

    let user = UserRepo::find_by_id(&state.pool, current.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }

    let (refresh_token, next) = new_session(&state, user.id, client);
    SessionRepo::rotate(&state.pool, current.id, &next)
        .await?
        .ok_or_else(invalid_refresh_token)?;

    Ok(Json(auth_response(&state, user, refresh_token)?))
}

/// POST /api/auth/logout
///
/// Signs the caller out everywhere.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::debug!(user_id = auth_user.user_id, revoked, "Sessions revoked on logout");
    audit::record(
        &state,
        Some(auth_user.user_id),
        actions::LOGOUT,
        entities::USER,
        Some(auth_user.user_id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let (user, granted) = resolve_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: MeResponse {
            user,
            permissions: granted.into_iter().collect(),
        },
    }))
}

/// GET /api/auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionView>>>> {
    let sessions = SessionRepo::list_active_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: sessions.into_iter().map(SessionView::from).collect(),
    }))
}

/// DELETE /api/auth/sessions/{id}
///
/// Signs out a single device. Other users' sessions look like missing ones.
pub async fn revoke_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !SessionRepo::revoke_for_user(&state.pool, id, auth_user.user_id).await? {
        return Err(AppError::not_found("Session", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/change-password
///
/// Every refresh session is revoked, so other devices must log in again.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    let current_ok = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_ok {
        return Err(AppError::validation("Current password is incorrect"));
    }
    if input.new_password == input.current_password {
        return Err(AppError::validation(
            "New password must differ from the current one",
        ));
    }

    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(AppError::validation)?;

    let hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &hash).await?;
    SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;

    audit::record(
        &state,
        Some(user.id),
        actions::PASSWORD_CHANGE,
        entities::USER,
        Some(user.id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Fresh refresh token plus the session row that will hold its digest.
fn new_session(state: &AppState, user_id: DbId, client: ClientInfo) -> (String, CreateSession) {
    let (plaintext, digest) = generate_refresh_token();
    let session = CreateSession {
        user_id,
        refresh_token_hash: digest,
        expires_at: Utc::now() + state.config.jwt.refresh_ttl(),
        user_agent: client.user_agent,
        ip_address: client.ip_address,
    };
    (plaintext, session)
}

fn auth_response(state: &AppState, user: User, refresh_token: String) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        expires_in: state.config.jwt.access_ttl().num_seconds(),
        user,
    })
}
