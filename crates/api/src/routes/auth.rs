//! Route definitions for `/auth`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /login              -> login (public)
/// POST   /refresh            -> refresh (public)
/// POST   /logout             -> logout
/// GET    /me                 -> me
/// POST   /change-password    -> change_password
/// GET    /sessions           -> list_sessions
/// DELETE /sessions/{id}      -> revoke_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
        .route("/sessions", get(auth::list_sessions))
        .route("/sessions/{id}", delete(auth::revoke_session))
}
