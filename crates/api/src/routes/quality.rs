//! Route definitions for `/quality`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::quality;
use crate::state::AppState;

/// Routes mounted at `/quality`.
///
/// ```text
/// GET    /incidents                   -> list_incidents
/// POST   /incidents                   -> create_incident
/// GET    /incidents/{id}              -> get_incident
/// PATCH  /incidents/{id}              -> update_incident
/// POST   /incidents/{id}/status       -> change_incident_status
/// POST   /incidents/{id}/handover     -> spawn_handover
///
/// GET    /complaints                  -> list_complaints
/// POST   /complaints                  -> create_complaint
/// GET    /complaints/{id}             -> get_complaint
/// PATCH  /complaints/{id}             -> update_complaint
/// POST   /complaints/{id}/resolve     -> resolve_complaint
///
/// GET    /stats                       -> stats (?from&to)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/incidents",
            get(quality::list_incidents).post(quality::create_incident),
        )
        .route(
            "/incidents/{id}",
            get(quality::get_incident).patch(quality::update_incident),
        )
        .route(
            "/incidents/{id}/status",
            post(quality::change_incident_status),
        )
        .route("/incidents/{id}/handover", post(quality::spawn_handover))
        .route(
            "/complaints",
            get(quality::list_complaints).post(quality::create_complaint),
        )
        .route(
            "/complaints/{id}",
            get(quality::get_complaint).patch(quality::update_complaint),
        )
        .route(
            "/complaints/{id}/resolve",
            post(quality::resolve_complaint),
        )
        .route("/stats", get(quality::stats))
}
