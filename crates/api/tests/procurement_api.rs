//! Purchase request approval, order issue and goods receipt into stock.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_ok, get_auth, post_auth, post_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

use clinicops_core::event_types;

async fn vendor(app: &axum::Router, token: &str) -> Value {
    create_ok(
        app,
        "/api/procurement/vendors",
        token,
        json!({ "name": "MedSupply Co", "email": "orders@medsupply.test" }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_request_to_receipt_flow_restocks_inventory(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let mut rx = bus.subscribe();

    let item = create_ok(
        &app,
        "/api/inventory/items",
        &admin,
        json!({ "sku": "GLV-M", "name": "Gloves M", "unit": "box" }),
    )
    .await;
    let vendor = vendor(&app, &admin).await;

    let request = create_ok(
        &app,
        "/api/procurement/requests",
        &nurse,
        json!({
            "title": "Ward gloves",
            "lines": [
                { "item_id": item["id"], "description": "Gloves M", "quantity": 10, "estimated_unit_cost_cents": 450 },
                { "description": "Sharps bin", "quantity": 2, "estimated_unit_cost_cents": 1200 }
            ]
        }),
    )
    .await;
    assert_eq!(request["status"], "pending");
    assert_eq!(request["estimated_total_cents"], 10 * 450 + 2 * 1200);
    let event = rx.try_recv().expect("submission event");
    assert_eq!(event.event_type, event_types::PURCHASE_REQUEST_SUBMITTED);

    // Ordering before approval is rejected.
    let order_uri = format!("/api/procurement/requests/{}/order", request["id"]);
    let response =
        post_json_auth(&app, &order_uri, &admin, json!({ "vendor_id": vendor["id"] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_auth(
        &app,
        &format!("/api/procurement/requests/{}/approve", request["id"]),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "approved");
    let event = rx.try_recv().expect("review event");
    assert_eq!(event.event_type, event_types::PURCHASE_REQUEST_REVIEWED);

    let order = create_ok(&app, &order_uri, &admin, json!({ "vendor_id": vendor["id"] })).await;
    assert_eq!(order["status"], "issued");
    assert_eq!(order["total_cents"], 6900);
    assert!(order["po_number"].as_str().unwrap().starts_with("PO-"));

    // The request can only be ordered once.
    let response =
        post_json_auth(&app, &order_uri, &admin, json!({ "vendor_id": vendor["id"] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let lines = order["lines"].as_array().unwrap();
    let glove_line = lines.iter().find(|l| l["item_id"] == item["id"]).unwrap();
    let bin_line = lines.iter().find(|l| l["item_id"].is_null()).unwrap();
    let receipt_uri = format!("/api/procurement/orders/{}/receipts", order["id"]);

    let detail = create_ok(
        &app,
        &receipt_uri,
        &admin,
        json!({ "lines": [{ "order_line_id": glove_line["id"], "quantity": 6 }] }),
    )
    .await;
    assert_eq!(detail["status"], "partially_received");
    assert_eq!(detail["receipts"].as_array().unwrap().len(), 1);

    let json = body_json(get_auth(&app, &format!("/api/inventory/items/{}", item["id"]), &admin).await).await;
    assert_eq!(json["data"]["quantity"], 6);

    // Over-receiving a line is rejected and leaves stock untouched.
    let response = post_json_auth(
        &app,
        &receipt_uri,
        &admin,
        json!({ "lines": [{ "order_line_id": glove_line["id"], "quantity": 5 }] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let detail = create_ok(
        &app,
        &receipt_uri,
        &admin,
        json!({ "lines": [
            { "order_line_id": glove_line["id"], "quantity": 4 },
            { "order_line_id": bin_line["id"], "quantity": 2 }
        ] }),
    )
    .await;
    assert_eq!(detail["status"], "received");

    let json = body_json(get_auth(&app, &format!("/api/inventory/items/{}", item["id"]), &admin).await).await;
    assert_eq!(json["data"]["quantity"], 10);

    let response = post_json_auth(
        &app,
        &receipt_uri,
        &admin,
        json!({ "lines": [{ "order_line_id": bin_line["id"], "quantity": 1 }] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_requester_cannot_approve_own_request(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let app = common::build_test_app(pool);

    let request = create_ok(
        &app,
        "/api/procurement/requests",
        &admin,
        json!({
            "title": "Printer toner",
            "lines": [{ "description": "Toner", "quantity": 1, "estimated_unit_cost_cents": 8000 }]
        }),
    )
    .await;

    let response = post_auth(
        &app,
        &format!("/api/procurement/requests/{}/approve", request["id"]),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_request_validation_and_scoped_listing(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, doctor) =
        common::user_with_token(&pool, "doc@clinic.test", "staff", Some("doctor")).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/procurement/requests",
        &nurse,
        json!({ "title": "Nothing", "lines": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Line bounds and the estimated total are checked before anything is stored.
    let oversized = json!([{ "description": "Scanner", "quantity": 1000, "estimated_unit_cost_cents": i64::MAX / 10 }]);
    let response = post_json_auth(
        &app,
        "/api/procurement/requests",
        &nurse,
        json!({ "title": "Too big", "lines": oversized }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let maximal = json!({ "description": "Bulk", "quantity": 1_000_000, "estimated_unit_cost_cents": 100_000_000_000_i64 });
    let response = post_json_auth(
        &app,
        "/api/procurement/requests",
        &nurse,
        json!({ "title": "Overflowing total", "lines": vec![maximal; 100] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("too large"));

    let line = json!([{ "description": "Thermometer", "quantity": 1, "estimated_unit_cost_cents": 2500 }]);
    create_ok(&app, "/api/procurement/requests", &nurse, json!({ "title": "A", "lines": line })).await;
    let mine = create_ok(&app, "/api/procurement/requests", &doctor, json!({ "title": "B", "lines": line })).await;

    // Without procurement.view only one's own requests are visible.
    let json = body_json(get_auth(&app, "/api/procurement/requests", &doctor).await).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["id"], mine["id"]);

    let json = body_json(get_auth(&app, "/api/procurement/requests", &admin).await).await;
    assert_eq!(json["meta"]["total"], 2);

    // Vendors are maintained by approvers.
    let response = post_json_auth(
        &app,
        "/api/procurement/vendors",
        &nurse,
        json!({ "name": "Nope Ltd" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_requester_cancels_pending_request(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let request = create_ok(
        &app,
        "/api/procurement/requests",
        &nurse,
        json!({
            "title": "Spare batteries",
            "lines": [{ "description": "AA x24", "quantity": 1, "estimated_unit_cost_cents": 1500 }]
        }),
    )
    .await;
    let cancel_uri = format!("/api/procurement/requests/{}/cancel", request["id"]);

    let response = post_auth(&app, &cancel_uri, &admin).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(&app, &cancel_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "cancelled");

    let response = post_auth(
        &app,
        &format!("/api/procurement/requests/{}/approve", request["id"]),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
