//! Shift handover lifecycle, ownership rules and assignment notices.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_ok, delete_auth, get_auth, patch_json_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

use clinicops_core::event_types;
use clinicops_events::Audience;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_handover_defaults_and_notifies_assignee(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let doctor = common::create_user(&pool, "doc@clinic.test", "staff", Some("doctor")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let mut rx = bus.subscribe();

    let handover = create_ok(
        &app,
        "/api/handovers",
        &nurse,
        json!({
            "title": "Bed 4 needs glucose check at 02:00",
            "shift": "night",
            "priority": "high",
            "assignee_id": doctor.id,
        }),
    )
    .await;
    assert_eq!(handover["status"], "open");
    assert_eq!(handover["priority"], "high");

    let event = rx.try_recv().expect("assignment event");
    assert_eq!(event.event_type, event_types::HANDOVER_ASSIGNED);
    assert_eq!(event.audience, Audience::User(doctor.id));

    let plain = create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Restock trolley" })).await;
    assert_eq!(plain["priority"], "medium");
    assert!(rx.try_recv().is_err(), "no assignee, no notice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_handover_rejects_bad_input(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    for body in [
        json!({ "title": "   " }),
        json!({ "title": "Ok", "priority": "whenever" }),
        json!({ "title": "Ok", "shift": "evening" }),
        json!({ "title": "Ok", "assignee_id": 999_999 }),
    ] {
        let response = post_json_auth(&app, "/api/handovers", &nurse, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_lifecycle_and_terminal_lock(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let handover = create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Discharge bed 2" })).await;
    let status_uri = format!("/api/handovers/{}/status", handover["id"]);

    // open -> done skips in_progress.
    let response = post_json_auth(&app, &status_uri, &nurse, json!({ "status": "done" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(&app, &status_uri, &nurse, json!({ "status": "in_progress" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(&app, &status_uri, &nurse, json!({ "status": "done" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "done");
    assert!(!json["data"]["completed_at"].is_null());

    let uri = format!("/api/handovers/{}", handover["id"]);
    let response = patch_json_auth(&app, &uri, &nurse, json!({ "title": "Changed" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(&app, &status_uri, &nurse, json!({ "status": "open" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_only_involved_users_or_managers_modify(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, other) =
        common::user_with_token(&pool, "other@clinic.test", "staff", Some("nurse")).await;
    let (_, manager) =
        common::user_with_token(&pool, "mgr@clinic.test", "manager", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let handover = create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Check IV line" })).await;
    let status_uri = format!("/api/handovers/{}/status", handover["id"]);
    let uri = format!("/api/handovers/{}", handover["id"]);

    let response =
        post_json_auth(&app, &status_uri, &other, json!({ "status": "in_progress" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = delete_auth(&app, &uri, &other).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Anyone who can see it may comment.
    let response = post_json_auth(
        &app,
        &format!("/api/handovers/{}/comments", handover["id"]),
        &other,
        json!({ "body": "Line flushed at 14:10" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response =
        post_json_auth(&app, &status_uri, &manager, json!({ "status": "cancelled" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get_auth(&app, &uri, &other).await).await;
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["comments"].as_array().unwrap().len(), 1);

    let response = delete_auth(&app, &uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(&app, &uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mine_filter_and_status_filter(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (doctor, doctor_token) =
        common::user_with_token(&pool, "doc@clinic.test", "staff", Some("doctor")).await;
    let app = common::build_test_app(pool);

    create_ok(&app, "/api/handovers", &nurse, json!({ "title": "Own task" })).await;
    create_ok(
        &app,
        "/api/handovers",
        &nurse,
        json!({ "title": "For the doctor", "assignee_id": doctor.id }),
    )
    .await;

    let json = body_json(get_auth(&app, "/api/handovers?mine=true", &doctor_token).await).await;
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["data"][0]["title"], "For the doctor");

    let json = body_json(get_auth(&app, "/api/handovers?status=open", &doctor_token).await).await;
    assert_eq!(json["meta"]["total"], 2);

    let response = get_auth(&app, "/api/handovers?status=closed", &doctor_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
