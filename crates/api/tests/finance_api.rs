//! Cost and revenue ledgers, period summaries and monthly snapshots.

mod common;

use axum::http::StatusCode;
use common::{body_json, body_text, create_ok, get_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

async fn seed_march(app: &axum::Router, token: &str) {
    for (category, amount, day) in [("rent", 300_000, "2026-03-01"), ("supplies", 100_000, "2026-03-12"), ("supplies", 50_000, "2026-03-20")] {
        create_ok(
            app,
            "/api/finance/costs",
            token,
            json!({ "category": category, "amount_cents": amount, "incurred_on": day }),
        )
        .await;
    }
    for (source, amount, day) in [("consultations", 400_000, "2026-03-05"), ("lab", 100_000, "2026-03-28")] {
        create_ok(
            app,
            "/api/finance/revenue",
            token,
            json!({ "source": source, "amount_cents": amount, "received_on": day }),
        )
        .await;
    }
    // Outside the month.
    create_ok(
        app,
        "/api/finance/costs",
        token,
        json!({ "category": "rent", "amount_cents": 300_000, "incurred_on": "2026-04-01" }),
    )
    .await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_summary_totals_and_breakdown(pool: PgPool) {
    let (_, accountant) =
        common::user_with_token(&pool, "acc@clinic.test", "staff", Some("accountant")).await;
    let app = common::build_test_app(pool);
    seed_march(&app, &accountant).await;

    let response = get_auth(&app, "/api/finance/summary?from=2026-03-01&to=2026-03-31", &accountant).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let summary = &json["data"];
    assert_eq!(summary["total_cost_cents"], 450_000);
    assert_eq!(summary["total_revenue_cents"], 500_000);
    assert_eq!(summary["net_cents"], 50_000);
    assert_eq!(summary["margin_pct"], 10.0);

    let costs = summary["cost_by_category"].as_array().unwrap();
    assert_eq!(costs[0]["key"], "rent");
    assert_eq!(costs[0]["share_pct"], 66.67);
    assert_eq!(costs[1]["key"], "supplies");
    assert_eq!(costs[1]["amount_cents"], 150_000);

    let response = get_auth(&app, "/api/finance/summary?from=2026-03-31&to=2026-03-01", &accountant).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_entries_require_positive_amounts_and_permissions(pool: PgPool) {
    let (_, accountant) =
        common::user_with_token(&pool, "acc@clinic.test", "staff", Some("accountant")).await;
    let (_, director) =
        common::user_with_token(&pool, "dir@clinic.test", "staff", Some("director")).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/finance/costs",
        &accountant,
        json!({ "category": "rent", "amount_cents": 0, "incurred_on": "2026-03-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/finance/revenue",
        &accountant,
        json!({ "source": "lab", "amount_cents": i64::MAX, "received_on": "2026-03-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Directors can read the books but not write them.
    let response = get_auth(&app, "/api/finance/costs", &director).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = post_json_auth(
        &app,
        "/api/finance/revenue",
        &director,
        json!({ "source": "lab", "amount_cents": 100, "received_on": "2026-03-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_snapshot_upserts_per_period(pool: PgPool) {
    let (_, accountant) =
        common::user_with_token(&pool, "acc@clinic.test", "staff", Some("accountant")).await;
    let app = common::build_test_app(pool);
    seed_march(&app, &accountant).await;

    let first = create_ok(&app, "/api/finance/snapshots", &accountant, json!({ "year": 2026, "month": 3 })).await;
    assert_eq!(first["period"], "2026-03");
    assert_eq!(first["net_cents"], 50_000);
    assert_eq!(first["breakdown_json"]["revenue_by_source"][0]["key"], "consultations");

    create_ok(
        &app,
        "/api/finance/revenue",
        &accountant,
        json!({ "source": "lab", "amount_cents": 50_000, "received_on": "2026-03-30" }),
    )
    .await;

    let second = create_ok(&app, "/api/finance/snapshots", &accountant, json!({ "year": 2026, "month": 3 })).await;
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["net_cents"], 100_000);

    let json = body_json(get_auth(&app, "/api/finance/snapshots?year=2026", &accountant).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = post_json_auth(&app, "/api/finance/snapshots", &accountant, json!({ "year": 2026, "month": 13 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_summary_export_csv(pool: PgPool) {
    let (_, accountant) =
        common::user_with_token(&pool, "acc@clinic.test", "staff", Some("accountant")).await;
    let app = common::build_test_app(pool);
    seed_march(&app, &accountant).await;

    let response = get_auth(
        &app,
        "/api/finance/summary/export?from=2026-03-01&to=2026-03-31&format=csv",
        &accountant,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.starts_with("kind,key,amount_cents,share_pct\n"));
    assert!(text.contains("cost,rent,300000,66.67\n"));
    assert!(text.contains("total,net,50000,10.00\n"));
}
