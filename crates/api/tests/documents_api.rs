//! SOP document publishing, versioning, read acknowledgements and
//! announcements.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_ok, delete_auth, get_auth, patch_json_auth, post_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

use clinicops_core::event_types;
use clinicops_events::Audience;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_publish_acknowledge_and_revise(pool: PgPool) {
    let (admin_user, admin) =
        common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (nurse_user, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);

    let doc = create_ok(
        &app,
        "/api/documents",
        &admin,
        json!({ "code": "SOP-HH-01", "title": "Hand hygiene", "content": "Wash for 20 seconds." }),
    )
    .await;
    assert_eq!(doc["status"], "draft");
    assert_eq!(doc["version"], 0);

    // Drafts cannot be acknowledged.
    let ack_uri = format!("/api/documents/{}/acknowledge", doc["id"]);
    let response = post_auth(&app, &ack_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut rx = bus.subscribe();
    let response = post_auth(&app, &format!("/api/documents/{}/publish", doc["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "published");
    assert_eq!(json["data"]["version"], 1);

    let event = rx.try_recv().expect("publish event");
    assert_eq!(event.event_type, event_types::DOCUMENT_PUBLISHED);
    assert_eq!(event.audience, Audience::AllActive);

    // Published documents are locked for editing.
    let doc_uri = format!("/api/documents/{}", doc["id"]);
    let response = patch_json_auth(&app, &doc_uri, &admin, json!({ "content": "Changed" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_auth(&app, &ack_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["version"], 1);

    let response = post_auth(&app, &ack_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let report_uri = format!("/api/documents/{}/acknowledgements", doc["id"]);
    let response = get_auth(&app, &report_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(get_auth(&app, &report_uri, &admin).await).await;
    let report = &json["data"];
    assert_eq!(report["acknowledged"].as_array().unwrap().len(), 1);
    assert_eq!(report["acknowledged"][0]["user_id"], nurse_user.id);
    assert_eq!(report["pending_user_ids"], json!([admin_user.id]));

    // Revise, edit and republish as version 2; acknowledgements start over.
    let response = post_auth(&app, &format!("/api/documents/{}/revise", doc["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "draft");

    let response = patch_json_auth(
        &app,
        &doc_uri,
        &admin,
        json!({ "content": "Wash for 20 seconds. Dry with single-use towels." }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(&app, &format!("/api/documents/{}/publish", doc["id"]), &admin).await;
    assert_eq!(body_json(response).await["data"]["version"], 2);

    let response = post_auth(&app, &ack_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json =
        body_json(get_auth(&app, &format!("/api/documents/{}/versions", doc["id"]), &nurse).await)
            .await;
    let versions = json["data"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], 2);
    assert_eq!(versions[1]["content"], "Wash for 20 seconds.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_document_codes_and_delete_rules(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/documents",
        &nurse,
        json!({ "code": "SOP-1", "title": "T", "content": "C" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        "/api/documents",
        &admin,
        json!({ "code": "sop lower", "title": "T", "content": "C" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "code": "SOP-WASTE", "title": "Clinical waste", "content": "Yellow bags." });
    let doc = create_ok(&app, "/api/documents", &admin, body.clone()).await;
    let response = post_json_auth(&app, "/api/documents", &admin, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    post_auth(&app, &format!("/api/documents/{}/publish", doc["id"]), &admin).await;
    let uri = format!("/api/documents/{}", doc["id"]);
    let response = delete_auth(&app, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_auth(&app, &format!("/api/documents/{}/archive", doc["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "archived");

    let draft = create_ok(
        &app,
        "/api/documents",
        &admin,
        json!({ "code": "SOP-TMP", "title": "Scratch", "content": "..." }),
    )
    .await;
    let response = delete_auth(&app, &format!("/api/documents/{}", draft["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_announcements_visible_to_everyone(pool: PgPool) {
    let (_, admin) = common::user_with_token(&pool, "admin@clinic.test", "admin", None).await;
    let (_, staff) = common::user_with_token(&pool, "new@clinic.test", "staff", None).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let mut rx = bus.subscribe();

    let announcement = create_ok(
        &app,
        "/api/announcements",
        &admin,
        json!({ "title": "Fire drill", "body": "Thursday 10:00", "priority": "urgent" }),
    )
    .await;
    assert_eq!(announcement["priority"], "urgent");

    let event = rx.try_recv().expect("announcement event");
    assert_eq!(event.event_type, event_types::ANNOUNCEMENT_PUBLISHED);
    assert!(event.title.contains("Fire drill"));

    let response = post_json_auth(
        &app,
        "/api/announcements",
        &admin,
        json!({ "title": "Old news", "body": "...", "expires_at": "2001-01-01T00:00:00Z" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A staff account with no position still sees announcements.
    let json = body_json(get_auth(&app, "/api/announcements", &staff).await).await;
    assert_eq!(json["meta"]["total"], 1);

    let response = post_json_auth(
        &app,
        "/api/announcements",
        &staff,
        json!({ "title": "Party", "body": "Friday" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response =
        delete_auth(&app, &format!("/api/announcements/{}", announcement["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let json = body_json(get_auth(&app, "/api/announcements", &staff).await).await;
    assert_eq!(json["meta"]["total"], 0);
}
