//! Route definitions for `/schedules`.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::scheduling;
use crate::state::AppState;

/// Routes mounted at `/schedules`.
///
/// ```text
/// GET    /shifts              -> list_shifts
/// POST   /shifts              -> create_shift
/// PATCH  /shifts/{id}         -> update_shift
/// DELETE /shifts/{id}         -> delete_shift
///
/// POST   /entries             -> upsert_entry
/// POST   /entries/bulk        -> bulk_upsert (all or nothing)
/// DELETE /entries/{id}        -> delete_entry
///
/// GET    /me                  -> my_schedule (?from&to)
/// GET    /grid                -> month_grid (?year&month&department&position)
/// GET    /export              -> export_grid (?year&month&format)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/shifts",
            get(scheduling::list_shifts).post(scheduling::create_shift),
        )
        .route(
            "/shifts/{id}",
            patch(scheduling::update_shift).delete(scheduling::delete_shift),
        )
        .route("/entries", post(scheduling::upsert_entry))
        .route("/entries/bulk", post(scheduling::bulk_upsert))
        .route("/entries/{id}", delete(scheduling::delete_entry))
        .route("/me", get(scheduling::my_schedule))
        .route("/grid", get(scheduling::month_grid))
        .route("/export", get(scheduling::export_grid))
}
