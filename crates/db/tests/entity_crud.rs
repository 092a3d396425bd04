//! Create/read/update round trips for the main entity tables.

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, Utc};
use clinicops_core::documents::DocumentStatus;
use clinicops_core::handover::HandoverStatus;
use clinicops_core::hr::LeaveStatus;
use clinicops_core::pagination::Page;
use clinicops_db::models::document::CreateDocument;
use clinicops_db::models::finance::NewSnapshot;
use clinicops_db::models::handover::{CreateHandover, HandoverListParams};
use clinicops_db::models::hr::CreateLeaveRequest;
use clinicops_db::models::user::{CreateUser, UpdateUser};
use clinicops_db::repositories::{DocumentRepo, FinanceRepo, HandoverRepo, HrRepo, UserRepo};
use sqlx::PgPool;

fn new_user(email: &str, role: &str, position: Option<&str>) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        full_name: format!("User {email}"),
        role: role.to_string(),
        position: position.map(str::to_string),
        department: Some("General".to_string()),
        phone: None,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn handover(title: &str, assignee_id: Option<i64>) -> CreateHandover {
    CreateHandover {
        title: title.to_string(),
        description: None,
        priority: None,
        shift: Some("morning".to_string()),
        department: None,
        assignee_id,
        due_at: None,
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_email_lookup_is_case_insensitive(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("nurse@clinic.test", "staff", Some("nurse")))
        .await
        .unwrap();

    let found = UserRepo::find_by_email(&pool, "NURSE@clinic.test").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_violates_unique_constraint(pool: PgPool) {
    UserRepo::create(&pool, &new_user("dup@clinic.test", "staff", None))
        .await
        .unwrap();
    let err = UserRepo::create(&pool, &new_user("dup@clinic.test", "staff", None))
        .await
        .unwrap_err();

    assert_matches!(err, sqlx::Error::Database(ref db) if db.constraint() == Some("uq_users_email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_update_applies_only_given_fields(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("doc@clinic.test", "staff", Some("doctor")))
        .await
        .unwrap();

    let updated = UserRepo::update(
        &pool,
        user.id,
        &UpdateUser {
            department: Some("Pediatrics".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.department.as_deref(), Some("Pediatrics"));
    assert_eq!(updated.position.as_deref(), Some("doctor"));
    assert_eq!(updated.email, "doc@clinic.test");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_login_counter_resets_on_success(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("lock@clinic.test", "staff", None))
        .await
        .unwrap();

    let until = Utc::now() + Duration::minutes(15);
    let (count, lock) = UserRepo::record_failed_login(&pool, user.id, 2, until).await.unwrap();
    assert_eq!((count, lock), (1, None));
    let (count, lock) = UserRepo::record_failed_login(&pool, user.id, 2, until).await.unwrap();
    assert_eq!(count, 2);
    assert!(lock.is_some(), "second failure reaches the limit");

    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.failed_login_count, 0);
    assert!(user.last_login_at.is_some());
    assert!(user.locked_until.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_active_ids_by_roles(pool: PgPool) {
    let admin = UserRepo::create(&pool, &new_user("a@clinic.test", "admin", None))
        .await
        .unwrap();
    let manager = UserRepo::create(&pool, &new_user("m@clinic.test", "manager", None))
        .await
        .unwrap();
    UserRepo::create(&pool, &new_user("s@clinic.test", "staff", None))
        .await
        .unwrap();

    let ids = UserRepo::active_ids_by_roles(&pool, &["admin".to_string(), "manager".to_string()])
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&admin.id));
    assert!(ids.contains(&manager.id));
}

// ---------------------------------------------------------------------------
// Handovers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_handover_status_change_is_guarded(pool: PgPool) {
    let author = UserRepo::create(&pool, &new_user("h@clinic.test", "manager", None))
        .await
        .unwrap();
    let h = HandoverRepo::create(&pool, &handover("Check ward B", None), author.id)
        .await
        .unwrap();
    assert_eq!(h.status, "open");
    assert_eq!(h.priority, "medium");

    let started = HandoverRepo::set_status(&pool, h.id, HandoverStatus::Open, HandoverStatus::InProgress)
        .await
        .unwrap();
    assert!(started.is_some());

    // A second writer still expecting `open` loses.
    let stale = HandoverRepo::set_status(&pool, h.id, HandoverStatus::Open, HandoverStatus::Cancelled)
        .await
        .unwrap();
    assert!(stale.is_none());

    let done = HandoverRepo::set_status(&pool, h.id, HandoverStatus::InProgress, HandoverStatus::Done)
        .await
        .unwrap()
        .unwrap();
    assert!(done.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_handover_mine_filter(pool: PgPool) {
    let author = UserRepo::create(&pool, &new_user("x@clinic.test", "manager", None))
        .await
        .unwrap();
    let nurse = UserRepo::create(&pool, &new_user("y@clinic.test", "staff", Some("nurse")))
        .await
        .unwrap();
    HandoverRepo::create(&pool, &handover("For nurse", Some(nurse.id)), author.id)
        .await
        .unwrap();
    HandoverRepo::create(&pool, &handover("Unassigned", None), author.id)
        .await
        .unwrap();

    let params = HandoverListParams::default();
    let mine = HandoverRepo::list(&pool, &params, Some(nurse.id), Page::new(None, None))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "For nurse");
    assert_eq!(HandoverRepo::count(&pool, &params, None).await.unwrap(), 2);
}

// ---------------------------------------------------------------------------
// Leave
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_overlapping_leave_detection_ignores_rejected(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("l@clinic.test", "staff", None))
        .await
        .unwrap();
    let leave = HrRepo::create_leave(
        &pool,
        user.id,
        &CreateLeaveRequest {
            leave_type: "annual".to_string(),
            start_date: date(2026, 5, 4),
            end_date: date(2026, 5, 8),
            reason: None,
        },
        5,
    )
    .await
    .unwrap();

    assert!(HrRepo::has_overlapping_leave(&pool, user.id, date(2026, 5, 8), date(2026, 5, 10))
        .await
        .unwrap());
    assert!(!HrRepo::has_overlapping_leave(&pool, user.id, date(2026, 5, 9), date(2026, 5, 10))
        .await
        .unwrap());

    HrRepo::close_leave(&pool, leave.id, LeaveStatus::Rejected, Some(user.id), None)
        .await
        .unwrap()
        .unwrap();
    assert!(!HrRepo::has_overlapping_leave(&pool, user.id, date(2026, 5, 4), date(2026, 5, 8))
        .await
        .unwrap());

    // Already closed.
    let again = HrRepo::close_leave(&pool, leave.id, LeaveStatus::Approved, Some(user.id), None)
        .await
        .unwrap();
    assert!(again.is_none());
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_document_publish_versions_and_acknowledgement(pool: PgPool) {
    let author = UserRepo::create(&pool, &new_user("q@clinic.test", "manager", None))
        .await
        .unwrap();
    let doc = DocumentRepo::create(
        &pool,
        &CreateDocument {
            code: "SOP-001".to_string(),
            title: "Hand hygiene".to_string(),
            category: Some("infection".to_string()),
            content: "Wash for 20 seconds.".to_string(),
        },
        author.id,
    )
    .await
    .unwrap();
    assert_eq!(doc.version, 0);

    let (published, v1) = DocumentRepo::publish(&pool, doc.id, author.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.version, 1);
    assert_eq!(published.status, "published");
    assert_eq!(v1.content, "Wash for 20 seconds.");

    // Publishing is only allowed from draft.
    assert!(DocumentRepo::publish(&pool, doc.id, author.id).await.unwrap().is_none());

    DocumentRepo::acknowledge(&pool, doc.id, author.id, 1).await.unwrap();
    let err = DocumentRepo::acknowledge(&pool, doc.id, author.id, 1)
        .await
        .unwrap_err();
    assert_matches!(err, sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505"));

    DocumentRepo::set_status(&pool, doc.id, DocumentStatus::Published, DocumentStatus::Draft)
        .await
        .unwrap()
        .unwrap();
    let (republished, _) = DocumentRepo::publish(&pool, doc.id, author.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(republished.version, 2);

    let versions = DocumentRepo::versions(&pool, doc.id).await.unwrap();
    assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);

    // The new version has no acknowledgements yet.
    assert!(DocumentRepo::acknowledgements(&pool, doc.id, 2).await.unwrap().is_empty());
    let pending = DocumentRepo::pending_acknowledgers(&pool, doc.id, 2).await.unwrap();
    assert_eq!(pending, vec![author.id]);
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_snapshot_upsert_overwrites_period(pool: PgPool) {
    let snapshot = |cost: i64| NewSnapshot {
        period: "2026-03".to_string(),
        total_cost_cents: cost,
        total_revenue_cents: 10_000,
        net_cents: 10_000 - cost,
        margin_pct: 0.0,
        breakdown_json: serde_json::json!({}),
        created_by_id: None,
    };

    let first = FinanceRepo::upsert_snapshot(&pool, &snapshot(4_000)).await.unwrap();
    let second = FinanceRepo::upsert_snapshot(&pool, &snapshot(6_000)).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.total_cost_cents, 6_000);
    assert_eq!(second.net_cents, 4_000);

    assert_eq!(FinanceRepo::list_snapshots(&pool, Some(2026)).await.unwrap().len(), 1);
    assert!(FinanceRepo::list_snapshots(&pool, Some(2025)).await.unwrap().is_empty());
}
