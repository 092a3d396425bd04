//! Route definitions for `/hr`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::hr;
use crate::state::AppState;

/// Routes mounted at `/hr`.
///
/// ```text
/// GET    /certifications              -> list_certifications (?user_id)
/// POST   /certifications              -> create_certification
/// GET    /certifications/expiring     -> expiring_certifications (?days)
/// GET    /certifications/{id}         -> get_certification
/// PATCH  /certifications/{id}         -> update_certification
/// DELETE /certifications/{id}         -> delete_certification
///
/// GET    /leave                       -> list_leave
/// POST   /leave                       -> create_leave
/// GET    /leave/summary               -> leave_summary (?user_id&year)
/// GET    /leave/{id}                  -> get_leave
/// POST   /leave/{id}/approve          -> approve_leave
/// POST   /leave/{id}/reject           -> reject_leave
/// POST   /leave/{id}/cancel           -> cancel_leave
///
/// GET    /skills                      -> list_skills (?user_id&skill)
/// POST   /skills                      -> create_skill
/// GET    /skills/matrix               -> skill_matrix
/// PATCH  /skills/{id}                 -> update_skill
/// DELETE /skills/{id}                 -> delete_skill
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Certifications
        .route(
            "/certifications",
            get(hr::list_certifications).post(hr::create_certification),
        )
        .route(
            "/certifications/expiring",
            get(hr::expiring_certifications),
        )
        .route(
            "/certifications/{id}",
            get(hr::get_certification)
                .patch(hr::update_certification)
                .delete(hr::delete_certification),
        )
        // Leave
        .route("/leave", get(hr::list_leave).post(hr::create_leave))
        .route("/leave/summary", get(hr::leave_summary))
        .route("/leave/{id}", get(hr::get_leave))
        .route("/leave/{id}/approve", post(hr::approve_leave))
        .route("/leave/{id}/reject", post(hr::reject_leave))
        .route("/leave/{id}/cancel", post(hr::cancel_leave))
        // Skills
        .route("/skills", get(hr::list_skills).post(hr::create_skill))
        .route("/skills/matrix", get(hr::skill_matrix))
        .route(
            "/skills/{id}",
            patch(hr::update_skill).delete(hr::delete_skill),
        )
}
