//! Route definitions for `/documents` and `/announcements`.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::documents;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET    /                        -> list_documents (?status&category&search)
/// POST   /                        -> create_document
/// GET    /{id}                    -> get_document
/// PATCH  /{id}                    -> update_document (drafts only)
/// DELETE /{id}                    -> delete_document (drafts only)
/// POST   /{id}/publish            -> publish_document
/// POST   /{id}/revise             -> revise_document
/// POST   /{id}/archive            -> archive_document
/// GET    /{id}/versions           -> list_versions
/// POST   /{id}/acknowledge        -> acknowledge_document
/// GET    /{id}/acknowledgements   -> list_acknowledgements
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/{id}",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/{id}/publish", post(documents::publish_document))
        .route("/{id}/revise", post(documents::revise_document))
        .route("/{id}/archive", post(documents::archive_document))
        .route("/{id}/versions", get(documents::list_versions))
        .route("/{id}/acknowledge", post(documents::acknowledge_document))
        .route(
            "/{id}/acknowledgements",
            get(documents::list_acknowledgements),
        )
}

/// Routes mounted at `/announcements`.
///
/// ```text
/// GET    /        -> list_announcements (?include_expired)
/// POST   /        -> create_announcement
/// DELETE /{id}    -> delete_announcement
/// ```
pub fn announcements_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_announcements).post(documents::create_announcement),
        )
        .route("/{id}", delete(documents::delete_announcement))
}
