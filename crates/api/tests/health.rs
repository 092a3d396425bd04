//! Health check and cross-cutting HTTP behaviour (request ids, CORS, error
//! envelope).

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, create_ok, get, get_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database_and_event_bus(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let _rx = bus.subscribe();

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["database"]["healthy"], true);
    assert_eq!(json["events"]["subscribers"], 1);
    assert_eq!(json["events"]["published"], 0);

    create_ok(
        &app,
        "/api/announcements",
        &admin,
        json!({ "title": "Fire drill", "body": "Thursday 10:00", "priority": "normal" }),
    )
    .await;

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["events"]["published"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_is_unavailable_without_database(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    pool.close().await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"]["healthy"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn every_response_carries_a_request_id(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(&app, "/no-such-page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn errors_use_the_json_envelope(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let json = body_json(get_auth(&app, "/api/finance/summary?from=2026-01-01&to=2026-01-31", &nurse).await).await;
    assert_eq!(json["code"], "FORBIDDEN");
    assert!(json["error"].is_string());

    let json = body_json(get_auth(&app, "/api/handovers/987654", &nurse).await).await;
    assert_eq!(json["code"], "NOT_FOUND");

    let response = post_json_auth(
        &app,
        "/api/handovers",
        &nurse,
        json!({ "title": "", "priority": "medium" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["fields"]["title"][0], "length");

    let handover = create_ok(
        &app,
        "/api/handovers",
        &nurse,
        json!({ "title": "Bed 4 fluids", "priority": "medium" }),
    )
    .await;
    let response = post_json_auth(
        &app,
        &format!("/api/handovers/{}/status", handover["id"]),
        &nurse,
        json!({ "status": "done" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_TRANSITION");
    assert_eq!(json["error"], "Invalid handover transition: open -> done");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cors_preflight_allows_the_frontend(pool: PgPool) {
    let app = common::build_test_app(pool);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auth/login")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "PATCH")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"].to_str().unwrap(),
        "http://localhost:5173"
    );
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("PATCH"), "got: {methods}");
}
