//! Route definitions for `/assets`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET    /                              -> list_assets
/// POST   /                              -> create_asset
/// GET    /{id}                          -> get_asset
/// PATCH  /{id}                          -> update_asset
/// DELETE /{id}                          -> retire_asset
///
/// GET    /{id}/maintenance              -> list_schedules
/// POST   /{id}/maintenance              -> create_schedule
/// GET    /{id}/maintenance-logs         -> maintenance_logs
/// GET    /maintenance/due               -> due_maintenance (?days)
/// POST   /maintenance/{id}/complete     -> complete_maintenance
///
/// GET    /{id}/faults                   -> asset_faults
/// POST   /{id}/faults                   -> report_fault
/// GET    /faults                        -> list_faults (?status)
/// POST   /faults/{id}/status            -> change_fault_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/{id}",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::retire_asset),
        )
        // Preventive maintenance
        .route(
            "/{id}/maintenance",
            get(assets::list_schedules).post(assets::create_schedule),
        )
        .route("/{id}/maintenance-logs", get(assets::maintenance_logs))
        .route("/maintenance/due", get(assets::due_maintenance))
        .route(
            "/maintenance/{id}/complete",
            post(assets::complete_maintenance),
        )
        // Fault reports
        .route(
            "/{id}/faults",
            get(assets::asset_faults).post(assets::report_fault),
        )
        .route("/faults", get(assets::list_faults))
        .route("/faults/{id}/status", post(assets::change_fault_status))
}
