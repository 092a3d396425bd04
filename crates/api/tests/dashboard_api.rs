//! Dashboard counters, their cache window and the per-caller unread count.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, create_ok, get, get_auth};
use serde_json::json;
use sqlx::PgPool;

use clinicops_api::notifications::NotificationRouter;
use clinicops_events::{Audience, ClinicEvent};

async fn summary(app: &axum::Router, token: &str) -> serde_json::Value {
    let response = get_auth(app, "/api/dashboard/summary", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_summary_counts_clinic_activity(pool: PgPool) {
    let (admin, admin_token) =
        common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, pharmacist) =
        common::user_with_token(&pool, "rx@clinic.test", "staff", Some("pharmacist")).await;
    let (_, accountant) =
        common::user_with_token(&pool, "acc@clinic.test", "staff", Some("accountant")).await;
    let app = common::build_test_app(pool.clone());
    let today = Utc::now().date_naive().to_string();

    create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Restock trolley" })).await;
    create_ok(
        &app,
        "/api/handovers",
        &nurse,
        json!({ "title": "Bed 2 oxygen alarm", "priority": "urgent" }),
    )
    .await;
    create_ok(
        &app,
        "/api/inventory/items",
        &pharmacist,
        json!({ "sku": "GLV-001", "name": "Nitrile gloves", "min_quantity": 5 }),
    )
    .await;
    create_ok(
        &app,
        "/api/finance/costs",
        &accountant,
        json!({ "category": "supplies", "amount_cents": 1_000, "incurred_on": today }),
    )
    .await;
    create_ok(
        &app,
        "/api/finance/revenue",
        &accountant,
        json!({ "source": "consultations", "amount_cents": 4_000, "received_on": today }),
    )
    .await;

    NotificationRouter::new(pool.clone())
        .route_event(
            &ClinicEvent::new("test.notice", "Heads up", "Inbox check")
                .with_audience(Audience::User(admin.id)),
        )
        .await
        .unwrap();

    let data = summary(&app, &admin_token).await;
    assert_eq!(data["open_handovers"], 2);
    assert_eq!(data["urgent_handovers"], 1);
    assert_eq!(data["low_stock_items"], 1);
    assert_eq!(data["pending_leave_requests"], 0);
    assert_eq!(data["month_cost_cents"], 1_000);
    assert_eq!(data["month_revenue_cents"], 4_000);
    assert_eq!(data["month_net_cents"], 3_000);
    assert_eq!(data["month_margin_pct"], 75.0);
    assert_eq!(data["unread_notifications"], 1);

    // Everyone sees the same clinic counters but only their own inbox.
    let data = summary(&app, &nurse).await;
    assert_eq!(data["open_handovers"], 2);
    assert_eq!(data["unread_notifications"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counters_are_cached_but_unread_count_is_live(pool: PgPool) {
    let (admin, admin_token) =
        common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool.clone());

    create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Check fridge log" })).await;
    assert_eq!(summary(&app, &admin_token).await["open_handovers"], 1);

    create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Call lab" })).await;
    NotificationRouter::new(pool.clone())
        .route_event(
            &ClinicEvent::new("test.notice", "Heads up", "Inbox check")
                .with_audience(Audience::User(admin.id)),
        )
        .await
        .unwrap();

    let data = summary(&app, &admin_token).await;
    assert_eq!(data["open_handovers"], 1, "served from cache within the TTL");
    assert_eq!(data["unread_notifications"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_summary_requires_login(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(&app, "/api/dashboard/summary").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
