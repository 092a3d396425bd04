//! Route definitions for `/inventory`.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::inventory;
use crate::state::AppState;

/// Routes mounted at `/inventory`.
///
/// ```text
/// GET    /categories                     -> list_categories
/// POST   /categories                     -> create_category
/// PATCH  /categories/{id}                -> update_category
/// DELETE /categories/{id}                -> delete_category
///
/// GET    /items                          -> list_items
/// POST   /items                          -> create_item
/// GET    /items/low-stock                -> low_stock
/// GET    /items/{id}                     -> get_item
/// PATCH  /items/{id}                     -> update_item
/// DELETE /items/{id}                     -> delete_item (deactivate)
/// GET    /items/{id}/transactions        -> list_transactions
/// POST   /items/{id}/transactions        -> create_transaction
///
/// GET    /export                         -> export_items (?format=csv|xlsx)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(inventory::list_categories).post(inventory::create_category),
        )
        .route(
            "/categories/{id}",
            patch(inventory::update_category).delete(inventory::delete_category),
        )
        .route(
            "/items",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route("/items/low-stock", get(inventory::low_stock))
        .route(
            "/items/{id}",
            get(inventory::get_item)
                .patch(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route(
            "/items/{id}/transactions",
            get(inventory::list_transactions).post(inventory::create_transaction),
        )
        .route("/export", get(inventory::export_items))
}
