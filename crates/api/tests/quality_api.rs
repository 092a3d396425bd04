//! Incident reporting, investigation workflow, follow-up handovers and
//! patient complaints.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_ok, get_auth, patch_json_auth, post_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

use clinicops_core::event_types;
use clinicops_events::Audience;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_critical_incident_alerts_managers(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);
    let mut rx = bus.subscribe();

    let incident = create_ok(
        &app,
        "/api/quality/incidents",
        &nurse,
        json!({ "title": "Patient fall in corridor", "description": "Wet floor near ward B", "severity": "critical" }),
    )
    .await;
    assert_eq!(incident["status"], "reported");

    let event = rx.try_recv().expect("escalation event");
    assert_eq!(event.event_type, event_types::INCIDENT_REPORTED);
    assert!(matches!(event.audience, Audience::Roles(_)));

    create_ok(
        &app,
        "/api/quality/incidents",
        &nurse,
        json!({ "title": "Label misprint", "description": "Minor", "severity": "low" }),
    )
    .await;
    assert!(rx.try_recv().is_err(), "low severity is not escalated");

    let response = post_json_auth(
        &app,
        "/api/quality/incidents",
        &nurse,
        json!({ "title": "X", "description": "Y", "severity": "catastrophic" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_resolution_requires_corrective_action(pool: PgPool) {
    let (_, nurse) =
        common::user_with_token(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let (_, manager) =
        common::user_with_token(&pool, "mgr@clinic.test", "manager", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let incident = create_ok(
        &app,
        "/api/quality/incidents",
        &nurse,
        json!({ "title": "Wrong dose charted", "description": "Caught before administration", "severity": "medium" }),
    )
    .await;
    let status_uri = format!("/api/quality/incidents/{}/status", incident["id"]);

    // Staff without quality.manage cannot move it.
    let response =
        post_json_auth(&app, &status_uri, &nurse, json!({ "status": "investigating" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Investigation cannot be skipped.
    let response =
        post_json_auth(&app, &status_uri, &manager, json!({ "status": "resolved" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        post_json_auth(&app, &status_uri, &manager, json!({ "status": "investigating" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response =
        post_json_auth(&app, &status_uri, &manager, json!({ "status": "resolved" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        &status_uri,
        &manager,
        json!({ "status": "resolved", "corrective_action": "Double-check step added to MAR" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "resolved");
    assert_eq!(json["data"]["corrective_action"], "Double-check step added to MAR");
    assert!(!json["data"]["resolved_at"].is_null());

    let response = post_json_auth(&app, &status_uri, &manager, json!({ "status": "closed" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/quality/incidents/{}", incident["id"]);
    let response = patch_json_auth(&app, &uri, &manager, json!({ "title": "Edited" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_incident_spawns_one_handover(pool: PgPool) {
    let (_, manager) =
        common::user_with_token(&pool, "mgr@clinic.test", "manager", Some("nurse")).await;
    let tech = common::create_user(&pool, "tech@clinic.test", "staff", Some("technician")).await;
    let (app, bus) = common::build_test_app_with_bus(pool);

    let incident = create_ok(
        &app,
        "/api/quality/incidents",
        &manager,
        json!({
            "title": "Oxygen alarm silent",
            "description": "Alarm on bed 3 did not sound during test",
            "severity": "critical",
            "assigned_to_id": tech.id,
        }),
    )
    .await;

    let mut rx = bus.subscribe();
    let uri = format!("/api/quality/incidents/{}/handover", incident["id"]);
    let spawned = create_ok(&app, &uri, &manager, json!({})).await;
    let handover = &spawned["handover"];
    assert_eq!(handover["priority"], "urgent");
    assert_eq!(handover["assignee_id"], tech.id);
    assert_eq!(handover["source_incident_id"], incident["id"]);
    assert!(handover["title"].as_str().unwrap().contains("Oxygen alarm silent"));
    assert_eq!(spawned["incident"]["handover_id"], handover["id"]);

    let event = rx.try_recv().expect("handover assignment event");
    assert_eq!(event.event_type, event_types::HANDOVER_ASSIGNED);
    assert_eq!(event.audience, Audience::User(tech.id));

    let response = post_auth(&app, &uri, &manager).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(
        get_auth(&app, &format!("/api/handovers/{}", handover["id"]), &manager).await,
    )
    .await;
    assert_eq!(json["data"]["status"], "open");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complaint_resolution_and_stats(pool: PgPool) {
    let (_, receptionist) =
        common::user_with_token(&pool, "front@clinic.test", "staff", Some("receptionist")).await;
    let (_, manager) =
        common::user_with_token(&pool, "mgr@clinic.test", "manager", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let complaint = create_ok(
        &app,
        "/api/quality/complaints",
        &receptionist,
        json!({ "complainant_name": "J. Doe", "channel": "phone", "description": "Waited two hours" }),
    )
    .await;
    assert_eq!(complaint["status"], "open");
    create_ok(
        &app,
        "/api/quality/complaints",
        &receptionist,
        json!({ "complainant_name": "A. Roe", "channel": "email", "description": "Billing error" }),
    )
    .await;

    let response = post_json_auth(
        &app,
        "/api/quality/complaints",
        &receptionist,
        json!({ "complainant_name": "X", "channel": "carrier_pigeon", "description": "?" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let resolve_uri = format!("/api/quality/complaints/{}/resolve", complaint["id"]);
    let response = post_json_auth(
        &app,
        &resolve_uri,
        &receptionist,
        json!({ "response": "Apologised" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        &resolve_uri,
        &manager,
        json!({ "response": "Called back, triage rota changed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "resolved");

    let response = post_json_auth(&app, &resolve_uri, &manager, json!({ "response": "Again" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    create_ok(
        &app,
        "/api/quality/incidents",
        &receptionist,
        json!({ "title": "Door left unlocked", "description": "Store room", "severity": "low" }),
    )
    .await;

    let json = body_json(get_auth(&app, "/api/quality/stats", &manager).await).await;
    let stats = &json["data"];
    assert_eq!(stats["incidents_total"], 1);
    assert_eq!(stats["resolution_rate_pct"], 0.0);
    let by_status = stats["complaints_by_status"].as_array().unwrap();
    let resolved = by_status.iter().find(|r| r["key"] == "resolved").unwrap();
    assert_eq!(resolved["count"], 1);
}
