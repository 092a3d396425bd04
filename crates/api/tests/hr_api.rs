//! Leave requests, certifications and the skill register.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, create_ok, get_auth, post_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

use clinicops_core::event_types;
use clinicops_events::Audience;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_leave_filing_overlap_and_review(pool: PgPool) {
    let (nurse_user, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, director) =
        common::user_with_token(&pool, "dir@clinic.test", "staff", Some("director")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let mut rx = bus.subscribe();

    let leave = create_ok(
        &app,
        "/api/hr/leave",
        &nurse,
        json!({ "leave_type": "annual", "start_date": "2026-11-02", "end_date": "2026-11-04" }),
    )
    .await;
    assert_eq!(leave["days"], 3);
    assert_eq!(leave["status"], "pending");
    let event = rx.try_recv().expect("submission event");
    assert_eq!(event.event_type, event_types::LEAVE_SUBMITTED);

    let response = post_json_auth(
        &app,
        "/api/hr/leave",
        &nurse,
        json!({ "leave_type": "sick", "start_date": "2026-11-04", "end_date": "2026-11-05" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        &app,
        "/api/hr/leave",
        &nurse,
        json!({ "leave_type": "annual", "start_date": "2026-11-10", "end_date": "2026-11-09" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let approve_uri = format!("/api/hr/leave/{}/approve", leave["id"]);
    let response = post_auth(&app, &approve_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response =
        post_json_auth(&app, &approve_uri, &director, json!({ "note": "Covered by M. Ortiz" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["review_note"], "Covered by M. Ortiz");

    let event = rx.try_recv().expect("review event");
    assert_eq!(event.event_type, event_types::LEAVE_REVIEWED);
    assert_eq!(event.audience, Audience::User(nurse_user.id));

    let response = post_auth(&app, &approve_uri, &director).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = post_auth(&app, &format!("/api/hr/leave/{}/cancel", leave["id"]), &nurse).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/api/hr/leave/summary?year=2026&user_id={}", nurse_user.id);
    let json = body_json(get_auth(&app, &uri, &director).await).await;
    assert_eq!(json["data"]["total_days"], 3);
    let annual = json["data"]["by_type"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["leave_type"] == "annual")
        .cloned()
        .unwrap();
    assert_eq!(annual["days"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reviewers_cannot_decide_their_own_leave(pool: PgPool) {
    let (_, director) =
        common::user_with_token(&pool, "dir@clinic.test", "staff", Some("director")).await;
    let app = common::build_test_app(pool);

    let leave = create_ok(
        &app,
        "/api/hr/leave",
        &director,
        json!({ "leave_type": "personal", "start_date": "2026-12-01", "end_date": "2026-12-01" }),
    )
    .await;

    let response =
        post_auth(&app, &format!("/api/hr/leave/{}/approve", leave["id"]), &director).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancelled_leave_frees_the_dates(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, other) =
        common::user_with_token(&pool, "other@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let body = json!({ "leave_type": "annual", "start_date": "2026-11-20", "end_date": "2026-11-22" });
    let leave = create_ok(&app, "/api/hr/leave", &nurse, body.clone()).await;

    let cancel_uri = format!("/api/hr/leave/{}/cancel", leave["id"]);
    let response = post_auth(&app, &cancel_uri, &other).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = post_auth(&app, &cancel_uri, &nurse).await;
    assert_eq!(response.status(), StatusCode::OK);

    create_ok(&app, "/api/hr/leave", &nurse, body).await;

    // Staff only ever see their own leave.
    let json = body_json(get_auth(&app, "/api/hr/leave", &other).await).await;
    assert_eq!(json["meta"]["total"], 0);
    let json = body_json(get_auth(&app, "/api/hr/leave", &nurse).await).await;
    assert_eq!(json["meta"]["total"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_certification_expiry_tracking(pool: PgPool) {
    let (nurse_user, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, director) =
        common::user_with_token(&pool, "dir@clinic.test", "staff", Some("director")).await;
    let app = common::build_test_app(pool);

    let today = Utc::now().date_naive();
    let soon = create_ok(
        &app,
        "/api/hr/certifications",
        &director,
        json!({ "user_id": nurse_user.id, "name": "BLS", "expires_on": today + Duration::days(10) }),
    )
    .await;
    assert_eq!(soon["expiry_status"], "expiring");

    let later = create_ok(
        &app,
        "/api/hr/certifications",
        &director,
        json!({ "user_id": nurse_user.id, "name": "Nursing licence", "expires_on": today + Duration::days(400) }),
    )
    .await;
    assert_eq!(later["expiry_status"], "valid");

    let response = post_json_auth(
        &app,
        "/api/hr/certifications",
        &director,
        json!({
            "user_id": nurse_user.id,
            "name": "ACLS",
            "issued_on": "2026-05-01",
            "expires_on": "2026-04-01"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json =
        body_json(get_auth(&app, "/api/hr/certifications/expiring?days=30", &director).await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], soon["id"]);

    // The holder can list their own certifications without hr.view.
    let uri = format!("/api/hr/certifications?user_id={}", nurse_user.id);
    let json = body_json(get_auth(&app, &uri, &nurse).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    let response = get_auth(&app, "/api/hr/certifications", &nurse).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_skills_are_normalized_and_unique(pool: PgPool) {
    let nurse = common::create_user(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, director) =
        common::user_with_token(&pool, "dir@clinic.test", "staff", Some("director")).await;
    let app = common::build_test_app(pool);

    let skill = create_ok(
        &app,
        "/api/hr/skills",
        &director,
        json!({ "user_id": nurse.id, "skill": "  Phlebotomy ", "level": 3 }),
    )
    .await;
    assert_eq!(skill["skill"], "phlebotomy");

    let response = post_json_auth(
        &app,
        "/api/hr/skills",
        &director,
        json!({ "user_id": nurse.id, "skill": "PHLEBOTOMY", "level": 4 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        &app,
        "/api/hr/skills",
        &director,
        json!({ "user_id": nurse.id, "skill": "Triage", "level": 6 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(get_auth(&app, "/api/hr/skills/matrix", &director).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
