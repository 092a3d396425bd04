//! Route definitions for `/handovers`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::handovers;
use crate::state::AppState;

/// Routes mounted at `/handovers`.
///
/// ```text
/// GET    /                  -> list_handovers
/// POST   /                  -> create_handover
/// GET    /{id}              -> get_handover (with comments)
/// PATCH  /{id}              -> update_handover
/// DELETE /{id}              -> delete_handover
/// POST   /{id}/status       -> change_status
/// POST   /{id}/comments     -> add_comment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handovers::list_handovers).post(handovers::create_handover),
        )
        .route(
            "/{id}",
            get(handovers::get_handover)
                .patch(handovers::update_handover)
                .delete(handovers::delete_handover),
        )
        .route("/{id}/status", post(handovers::change_status))
        .route("/{id}/comments", post(handovers::add_comment))
}
