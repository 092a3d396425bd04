//! Route definitions for `/finance`.

use axum::routing::get;
use axum::Router;

use crate::handlers::finance;
use crate::state::AppState;

/// Routes mounted at `/finance`.
///
/// ```text
/// GET    /costs               -> list_costs (?from&to)
/// POST   /costs               -> create_cost
/// GET    /costs/{id}          -> get_cost
/// PATCH  /costs/{id}          -> update_cost
/// DELETE /costs/{id}          -> delete_cost
///
/// GET    /revenue             -> list_revenue (?from&to)
/// POST   /revenue             -> create_revenue
/// GET    /revenue/{id}        -> get_revenue
/// PATCH  /revenue/{id}        -> update_revenue
/// DELETE /revenue/{id}        -> delete_revenue
///
/// GET    /summary             -> summary (?from&to)
/// GET    /summary/export      -> export_summary (?from&to&format)
/// GET    /snapshots           -> list_snapshots (?year)
/// POST   /snapshots           -> create_snapshot
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/costs",
            get(finance::list_costs).post(finance::create_cost),
        )
        .route(
            "/costs/{id}",
            get(finance::get_cost)
                .patch(finance::update_cost)
                .delete(finance::delete_cost),
        )
        .route(
            "/revenue",
            get(finance::list_revenue).post(finance::create_revenue),
        )
        .route(
            "/revenue/{id}",
            get(finance::get_revenue)
                .patch(finance::update_revenue)
                .delete(finance::delete_revenue),
        )
        .route("/summary", get(finance::summary))
        .route("/summary/export", get(finance::export_summary))
        .route(
            "/snapshots",
            get(finance::list_snapshots).post(finance::create_snapshot),
        )
}
