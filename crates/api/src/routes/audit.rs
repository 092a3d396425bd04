//! Route definitions for `/audit-logs`.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Routes mounted at `/audit-logs`.
///
/// ```text
/// GET    /          -> query_audit_logs
/// GET    /export    -> export_audit_logs (CSV)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::query_audit_logs))
        .route("/export", get(audit::export_audit_logs))
}
