//! Handler for the clinic-wide dashboard summary.

use axum::extract::State;
use axum::Json;
use chrono::{Datelike, Utc};
use clinicops_core::assets::MAINTENANCE_DUE_WINDOW_DAYS;
use clinicops_core::dates::month_bounds;
use clinicops_core::finance::percentage;
use clinicops_db::models::dashboard::DashboardCounts;
use clinicops_db::repositories::{DashboardRepo, NotificationRepo};
use serde::Serialize;

use crate::cache::KEY_DASHBOARD_COUNTS;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub month_net_cents: i64,
    pub month_margin_pct: f64,
    /// Per-caller, never cached.
    pub unread_notifications: i64,
}

/// GET /api/dashboard/summary
///
/// Clinic counters are served from the TTL cache; the unread count is
/// always fresh.
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<DashboardSummary>>> {
    let counts = match state.cache.get::<DashboardCounts>(KEY_DASHBOARD_COUNTS) {
        Some(counts) => counts,
        None => {
            let seen = state.cache.generation(KEY_DASHBOARD_COUNTS);
            let today = Utc::now().date_naive();
            let (month_start, month_end) = month_bounds(today.year(), today.month())?;
            let cutoff = today + chrono::Duration::days(MAINTENANCE_DUE_WINDOW_DAYS);
            let counts = DashboardRepo::counts(&state.pool, cutoff, month_start, month_end).await?;
            state.cache.insert(KEY_DASHBOARD_COUNTS, seen, &counts);
            counts
        }
    };

    let unread_notifications = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    let month_net_cents = counts.month_revenue_cents - counts.month_cost_cents;
    let month_margin_pct = percentage(month_net_cents, counts.month_revenue_cents);

    Ok(Json(DataResponse {
        data: DashboardSummary {
            counts,
            month_net_cents,
            month_margin_pct,
            unread_notifications,
        },
    }))
}
