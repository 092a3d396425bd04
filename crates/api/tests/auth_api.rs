//! HTTP-level tests for login, token refresh, logout, lockout and the
//! caller's own profile.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth, TEST_PASSWORD};
use serde_json::json;
use sqlx::PgPool;

async fn login(app: &axum::Router, email: &str, password: &str) -> serde_json::Value {
    let response = post_json(app, "/api/auth/login", json!({ "email": email, "password": password })).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let user = common::create_user(&pool, "nurse@clinic.test", "staff", Some("nurse")).await;
    let app = common::build_test_app(pool);

    let json = login(&app, "nurse@clinic.test", TEST_PASSWORD).await;

    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["role"], "staff");
    assert!(json["user"].get("password_hash").is_none(), "hash must never be serialized");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    let user = common::create_user(&pool, "wrong@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "wrong@clinic.test", "password": "not-the-password" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (action, attempts): (String, serde_json::Value) = sqlx::query_as(
        "SELECT action, details_json FROM audit_logs WHERE entity_type = 'user' AND entity_id = $1",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(action, "login_failed");
    assert_eq!(attempts["failed_attempts"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_unknown_email(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "ghost@clinic.test", "password": "whatever1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_inactive_user(pool: PgPool) {
    let user = common::create_user(&pool, "gone@clinic.test", "staff", None).await;
    clinicops_db::repositories::UserRepo::deactivate(&pool, user.id)
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "gone@clinic.test", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_account_locks_after_five_failures(pool: PgPool) {
    common::create_user(&pool, "locked@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let response = post_json(
            &app,
            "/api/auth/login",
            json!({ "email": "locked@clinic.test", "password": "bad-password" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused while locked.
    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "locked@clinic.test", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_refresh_rotates_token(pool: PgPool) {
    common::create_user(&pool, "rotate@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool);

    let first = login(&app, "rotate@clinic.test", TEST_PASSWORD).await;
    let old_refresh = first["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(&app, "/api/auth/refresh", json!({ "refresh_token": old_refresh })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_ne!(second["refresh_token"], first["refresh_token"]);

    // The old token was consumed by the rotation.
    let response = post_json(&app, "/api/auth/refresh", json!({ "refresh_token": old_refresh })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_logout_revokes_refresh_tokens(pool: PgPool) {
    common::create_user(&pool, "bye@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool);

    let json = login(&app, "bye@clinic.test", TEST_PASSWORD).await;
    let access = json["access_token"].as_str().unwrap();
    let refresh = json["refresh_token"].as_str().unwrap();

    let response = common::post_auth(&app, "/api/auth/logout", access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(&app, "/api/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_me_lists_position_permissions(pool: PgPool) {
    let (_, token) =
        common::user_with_token(&pool, "pharm@clinic.test", "staff", Some("pharmacist")).await;
    let app = common::build_test_app(pool);

    let response = get_auth(&app, "/api/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "pharm@clinic.test");
    let perms: Vec<&str> = json["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert!(perms.contains(&"inventory.manage"));
    assert!(!perms.contains(&"finance.view"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_change_password(pool: PgPool) {
    let (_, token) = common::user_with_token(&pool, "pw@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/auth/change-password",
        &token,
        json!({ "current_password": "not-it-at-all", "new_password": "brand-new-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/auth/change-password",
        &token,
        json!({ "current_password": TEST_PASSWORD, "new_password": "brand-new-pass" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    login(&app, "pw@clinic.test", "brand-new-pass").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_or_bad_token_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(&app, "/api/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(&app, "/api/auth/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivated_user_token_is_forbidden(pool: PgPool) {
    let (user, token) = common::user_with_token(&pool, "late@clinic.test", "staff", None).await;
    clinicops_db::repositories::UserRepo::deactivate(&pool, user.id)
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let response = get_auth(&app, "/api/handovers", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sessions_record_client_and_can_be_revoked(pool: PgPool) {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    common::create_user(&pool, "devices@clinic.test", "staff", None).await;
    let app = common::build_test_app(pool);

    // Email matching ignores case.
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("user-agent", "WardTablet/2.1")
        .header("x-forwarded-for", "10.1.2.3, 172.16.0.1")
        .body(Body::from(
            json!({ "email": "Devices@Clinic.test", "password": TEST_PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tablet = body_json(response).await;
    let access = tablet["access_token"].as_str().unwrap();

    let desk = login(&app, "devices@clinic.test", TEST_PASSWORD).await;

    let json = body_json(get_auth(&app, "/api/auth/sessions", access).await).await;
    let sessions = json["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    let tablet_session = sessions
        .iter()
        .find(|s| s["user_agent"] == "WardTablet/2.1")
        .expect("tablet session listed");
    assert_eq!(tablet_session["ip_address"], "10.1.2.3");
    assert!(tablet_session.get("refresh_token_hash").is_none());

    let uri = format!("/api/auth/sessions/{}", tablet_session["id"]);
    let response = common::delete_auth(&app, &uri, access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = common::delete_auth(&app, &uri, access).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        &app,
        "/api/auth/refresh",
        json!({ "refresh_token": tablet["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post_json(
        &app,
        "/api/auth/refresh",
        json!({ "refresh_token": desk["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
