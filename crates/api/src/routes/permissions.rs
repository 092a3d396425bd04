//! Route definitions for `/permissions`.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::permissions;
use crate::state::AppState;

/// Routes mounted at `/permissions`.
///
/// ```text
/// GET    /catalog                    -> catalog
/// GET    /users/{id}                 -> user_permissions
/// PUT    /users/{id}/overrides       -> set_overrides
/// DELETE /overrides/{id}             -> delete_override
/// GET    /requests                   -> list_requests
/// POST   /requests                   -> create_request
/// POST   /requests/{id}/approve      -> approve_request
/// POST   /requests/{id}/reject       -> reject_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(permissions::catalog))
        .route("/users/{id}", get(permissions::user_permissions))
        .route("/users/{id}/overrides", put(permissions::set_overrides))
        .route("/overrides/{id}", delete(permissions::delete_override))
        .route(
            "/requests",
            get(permissions::list_requests).post(permissions::create_request),
        )
        .route("/requests/{id}/approve", post(permissions::approve_request))
        .route("/requests/{id}/reject", post(permissions::reject_request))
}
