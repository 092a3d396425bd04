pub mod assets;
pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod finance;
pub mod handovers;
pub mod health;
pub mod hr;
pub mod inventory;
pub mod notifications;
pub mod permissions;
pub mod procurement;
pub mod quality;
pub mod schedules;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                  login (public)
/// /auth/refresh                                refresh (public)
/// /auth/logout                                 logout
/// /auth/me                                     profile + effective permissions
/// /auth/change-password                        change own password
/// /auth/sessions                               signed-in devices, revoke one
///
/// /users                                       list, create (user.manage)
/// /users/directory                             active staff picker
/// /users/{id}                                  get, update, deactivate
/// /users/{id}/reset-password                   admin password reset
///
/// /permissions/catalog                         keys + position matrix
/// /permissions/users/{id}                      effective permissions
/// /permissions/users/{id}/overrides            upsert overrides (PUT)
/// /permissions/overrides/{id}                  delete override
/// /permissions/requests                        list, create
/// /permissions/requests/{id}/approve|reject    review
///
/// /audit-logs                                  query
/// /audit-logs/export                           CSV / XLSX export
///
/// /notifications                               caller's inbox
/// /dashboard/summary                           counters
///
/// /handovers                                   shift handover tasks
/// /inventory                                   categories, items, stock movements
/// /schedules                                   shifts, roster entries, monthly grid
/// /hr                                          certifications, leave, skills
/// /assets                                      equipment, maintenance, faults
/// /procurement                                 vendors, requests, orders, receipts
/// /quality                                     incidents, complaints, stats
/// /documents                                   SOP lifecycle + acknowledgements
/// /announcements                               clinic-wide announcements
/// /finance                                     costs, revenue, summary, snapshots
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Authentication and accounts.
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/permissions", permissions::router())
        .nest("/audit-logs", audit::router())
        // Inbox and landing page.
        .nest("/notifications", notifications::router())
        .nest("/dashboard", dashboard::router())
        // Operations.
        .nest("/handovers", handovers::router())
        .nest("/inventory", inventory::router())
        .nest("/schedules", schedules::router())
        .nest("/hr", hr::router())
        .nest("/assets", assets::router())
        .nest("/procurement", procurement::router())
        .nest("/quality", quality::router())
        .nest("/documents", documents::router())
        .nest("/announcements", documents::announcements_router())
        .nest("/finance", finance::router())
}
