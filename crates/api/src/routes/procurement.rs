//! Route definitions for `/procurement`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::procurement;
use crate::state::AppState;

/// Routes mounted at `/procurement`.
///
/// ```text
/// GET    /vendors                     -> list_vendors (?include_inactive)
/// POST   /vendors                     -> create_vendor
/// GET    /vendors/{id}                -> get_vendor
/// PATCH  /vendors/{id}                -> update_vendor
/// DELETE /vendors/{id}                -> delete_vendor (deactivate)
///
/// GET    /requests                    -> list_requests
/// POST   /requests                    -> create_request
/// GET    /requests/{id}               -> get_request
/// POST   /requests/{id}/approve       -> approve_request
/// POST   /requests/{id}/reject        -> reject_request
/// POST   /requests/{id}/cancel        -> cancel_request
/// POST   /requests/{id}/order         -> create_order
///
/// GET    /orders                      -> list_orders
/// GET    /orders/{id}                 -> get_order (lines + receipts)
/// POST   /orders/{id}/cancel          -> cancel_order
/// POST   /orders/{id}/receipts        -> receive_goods
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Vendors
        .route(
            "/vendors",
            get(procurement::list_vendors).post(procurement::create_vendor),
        )
        .route(
            "/vendors/{id}",
            get(procurement::get_vendor)
                .patch(procurement::update_vendor)
                .delete(procurement::delete_vendor),
        )
        // Purchase requests
        .route(
            "/requests",
            get(procurement::list_requests).post(procurement::create_request),
        )
        .route("/requests/{id}", get(procurement::get_request))
        .route("/requests/{id}/approve", post(procurement::approve_request))
        .route("/requests/{id}/reject", post(procurement::reject_request))
        .route("/requests/{id}/cancel", post(procurement::cancel_request))
        .route("/requests/{id}/order", post(procurement::create_order))
        // Purchase orders
        .route("/orders", get(procurement::list_orders))
        .route("/orders/{id}", get(procurement::get_order))
        .route("/orders/{id}/cancel", post(procurement::cancel_order))
        .route("/orders/{id}/receipts", post(procurement::receive_goods))
}
