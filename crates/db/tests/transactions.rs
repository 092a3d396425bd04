//! Multi-statement writes: stock ledger, purchase order receipts, incident
//! escalation and reminder bookkeeping.

use chrono::NaiveDate;
use clinicops_core::pagination::Page;
use clinicops_core::procurement::{format_po_number, status_after_receipt, PurchaseRequestStatus};
use clinicops_db::models::asset::{CreateAsset, CreateMaintenanceSchedule};
use clinicops_db::models::hr::CreateCertification;
use clinicops_db::models::inventory::{CreateItem, NewTransaction};
use clinicops_db::models::procurement::{CreatePurchaseRequest, CreateRequestLine, CreateVendor};
use clinicops_db::models::quality::CreateIncident;
use clinicops_db::models::user::CreateUser;
use clinicops_db::repositories::{
    AssetRepo, HandoverRepo, HrRepo, InventoryRepo, ProcurementRepo, QualityRepo, UserRepo,
};
use sqlx::PgPool;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_user(pool: &PgPool, email: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: "Tx Tester".to_string(),
            role: "manager".to_string(),
            position: Some("pharmacist".to_string()),
            department: None,
            phone: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_item(pool: &PgPool, sku: &str, min_quantity: i32) -> i64 {
    InventoryRepo::create_item(
        pool,
        &CreateItem {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            category_id: None,
            unit: Some("box".to_string()),
            min_quantity: Some(min_quantity),
            location: None,
            expiry_date: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Stock ledger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stock_movement_updates_balance_and_ledger(pool: PgPool) {
    let user_id = seed_user(&pool, "ledger@clinic.test").await;
    let item_id = seed_item(&pool, "SYR-005", 10).await;

    let mut tx = pool.begin().await.unwrap();
    let item = InventoryRepo::lock_item(&mut tx, item_id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 0);
    InventoryRepo::set_quantity(&mut tx, item_id, 25).await.unwrap();
    let txn = InventoryRepo::insert_transaction(
        &mut tx,
        &NewTransaction {
            item_id,
            txn_type: "in",
            quantity: 25,
            balance_before: 0,
            balance_after: 25,
            note: Some("initial stock"),
            reference: None,
            performed_by_id: Some(user_id),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(txn.balance_after, 25);
    let item = InventoryRepo::find_item(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 25);
    assert!(InventoryRepo::low_stock(&pool).await.unwrap().is_empty());

    let history = InventoryRepo::list_transactions(&pool, item_id, Page::new(None, None))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(InventoryRepo::count_transactions(&pool, item_id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rolled_back_movement_leaves_no_trace(pool: PgPool) {
    let item_id = seed_item(&pool, "GAU-010", 0).await;

    let mut tx = pool.begin().await.unwrap();
    InventoryRepo::set_quantity(&mut tx, item_id, 40).await.unwrap();
    InventoryRepo::insert_transaction(
        &mut tx,
        &NewTransaction {
            item_id,
            txn_type: "adjust",
            quantity: 40,
            balance_before: 0,
            balance_after: 40,
            note: None,
            reference: None,
            performed_by_id: None,
        },
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    let item = InventoryRepo::find_item(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 0);
    assert_eq!(InventoryRepo::count_transactions(&pool, item_id).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Procurement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_order_from_request_and_partial_receipt(pool: PgPool) {
    let user_id = seed_user(&pool, "buyer@clinic.test").await;
    let item_id = seed_item(&pool, "MSK-100", 0).await;
    let vendor = ProcurementRepo::create_vendor(
        &pool,
        &CreateVendor {
            name: "MedSupply".to_string(),
            contact_name: None,
            email: None,
            phone: None,
            address: None,
        },
    )
    .await
    .unwrap();

    let (request, lines) = ProcurementRepo::create_request(
        &pool,
        user_id,
        &CreatePurchaseRequest {
            title: "Masks".to_string(),
            justification: None,
            lines: vec![
                CreateRequestLine {
                    item_id: Some(item_id),
                    description: "Surgical masks".to_string(),
                    quantity: 10,
                    estimated_unit_cost_cents: 150,
                },
                CreateRequestLine {
                    item_id: None,
                    description: "Face shields".to_string(),
                    quantity: 2,
                    estimated_unit_cost_cents: 900,
                },
            ],
        },
    )
    .await
    .unwrap();
    assert_eq!(lines.len(), 2);

    ProcurementRepo::close_request(
        &pool,
        request.id,
        PurchaseRequestStatus::Approved,
        Some(user_id),
        None,
    )
    .await
    .unwrap()
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let prefix = "PO-202604-";
    let seq = ProcurementRepo::next_po_sequence(&mut tx, prefix).await.unwrap();
    assert_eq!(seq, 1);
    let order = ProcurementRepo::create_order_from_request(
        &mut tx,
        request.id,
        &format_po_number(2026, 4, seq),
        vendor.id,
        None,
        user_id,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(order.po_number, "PO-202604-0001");
    assert_eq!(order.total_cents, 10 * 150 + 2 * 900);
    let request = ProcurementRepo::find_request(&pool, request.id).await.unwrap().unwrap();
    assert_eq!(request.status, "ordered");

    // Receive half of the first line.
    let mut tx = pool.begin().await.unwrap();
    let order_lines = ProcurementRepo::lock_order_lines(&mut tx, order.id).await.unwrap();
    let receipt = ProcurementRepo::insert_receipt(&mut tx, order.id, user_id, Some("first box"))
        .await
        .unwrap();
    ProcurementRepo::insert_receipt_line(&mut tx, receipt.id, order_lines[0].id, 5)
        .await
        .unwrap();
    let after = ProcurementRepo::lock_order_lines(&mut tx, order.id).await.unwrap();
    let pairs: Vec<(i32, i32)> = after.iter().map(|l| (l.quantity, l.received_quantity)).collect();
    let order = ProcurementRepo::set_order_status(&mut tx, order.id, status_after_receipt(&pairs))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(order.status, "partially_received");
    let lines = ProcurementRepo::order_lines(&pool, order.id).await.unwrap();
    assert_eq!(lines[0].received_quantity, 5);
    assert_eq!(lines[1].received_quantity, 0);
    assert_eq!(ProcurementRepo::receipts_for_order(&pool, order.id).await.unwrap().len(), 1);
    assert_eq!(
        ProcurementRepo::receipt_lines_for_order(&pool, order.id).await.unwrap().len(),
        1
    );

    // Partially received orders cannot be cancelled.
    assert!(ProcurementRepo::cancel_order(&pool, order.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reviewing_a_closed_request_is_rejected(pool: PgPool) {
    let user_id = seed_user(&pool, "rev@clinic.test").await;
    let (request, _) = ProcurementRepo::create_request(
        &pool,
        user_id,
        &CreatePurchaseRequest {
            title: "Gloves".to_string(),
            justification: None,
            lines: vec![CreateRequestLine {
                item_id: None,
                description: "Nitrile gloves".to_string(),
                quantity: 1,
                estimated_unit_cost_cents: 0,
            }],
        },
    )
    .await
    .unwrap();

    let rejected = ProcurementRepo::close_request(
        &pool,
        request.id,
        PurchaseRequestStatus::Rejected,
        Some(user_id),
        Some("over budget"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(rejected.review_note.as_deref(), Some("over budget"));
    assert!(rejected.reviewed_at.is_some());

    let again = ProcurementRepo::close_request(
        &pool,
        request.id,
        PurchaseRequestStatus::Approved,
        Some(user_id),
        None,
    )
    .await
    .unwrap();
    assert!(again.is_none());
}

// ---------------------------------------------------------------------------
// Incident escalation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_handover_spawns_link_once(pool: PgPool) {
    let user_id = seed_user(&pool, "qa@clinic.test").await;
    let mut tx = pool.begin().await.unwrap();
    let incident = QualityRepo::create_incident(
        &mut tx,
        &CreateIncident {
            title: "Oxygen alarm silent".to_string(),
            description: "Bed 3 alarm did not sound".to_string(),
            category: None,
            severity: "high".to_string(),
            occurred_at: None,
            location: None,
            assigned_to_id: None,
        },
        user_id,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut first = pool.begin().await.unwrap();
    let handover = HandoverRepo::create_from_incident(
        &mut first, "First", "from incident", "high", None, user_id, incident.id,
    )
    .await
    .unwrap();
    assert!(QualityRepo::link_handover(&mut first, incident.id, handover.id)
        .await
        .unwrap()
        .is_some());

    // Waits on the incident row lock held by `first`, then finds it linked.
    let second = tokio::spawn({
        let pool = pool.clone();
        let incident_id = incident.id;
        async move {
            let mut tx = pool.begin().await.unwrap();
            let handover = HandoverRepo::create_from_incident(
                &mut tx, "Second", "from incident", "high", None, user_id, incident_id,
            )
            .await
            .unwrap();
            QualityRepo::link_handover(&mut tx, incident_id, handover.id)
                .await
                .unwrap()
        }
    });
    first.commit().await.unwrap();
    assert!(second.await.unwrap().is_none());

    let stored = QualityRepo::find_incident(&pool, incident.id).await.unwrap().unwrap();
    assert_eq!(stored.handover_id, Some(handover.id));
    let spawned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM handovers WHERE source_incident_id = $1")
            .bind(incident.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(spawned, 1);
}

// ---------------------------------------------------------------------------
// Reminder bookkeeping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_certification_reminded_once_per_expiry(pool: PgPool) {
    let user_id = seed_user(&pool, "cert@clinic.test").await;
    let cert = HrRepo::create_certification(
        &pool,
        &CreateCertification {
            user_id,
            name: "BLS".to_string(),
            issuer: None,
            license_number: None,
            issued_on: Some(date(2024, 6, 1)),
            expires_on: Some(date(2026, 6, 20)),
        },
    )
    .await
    .unwrap();

    let today = date(2026, 6, 1);
    let cutoff = date(2026, 7, 1);
    let due = HrRepo::certifications_due_for_reminder(&pool, today, cutoff)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, cert.id);

    HrRepo::mark_certification_reminded(&pool, cert.id, due[0].expires_on)
        .await
        .unwrap();
    assert!(HrRepo::certifications_due_for_reminder(&pool, today, cutoff)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_completing_maintenance_rolls_due_date_and_rearms_reminder(pool: PgPool) {
    let user_id = seed_user(&pool, "tech@clinic.test").await;
    let asset = AssetRepo::create(
        &pool,
        &CreateAsset {
            asset_tag: "ECG-01".to_string(),
            name: "ECG machine".to_string(),
            category: Some("diagnostic".to_string()),
            location: None,
            purchase_date: None,
            purchase_cost_cents: None,
            vendor_id: None,
            warranty_expires_on: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    let schedule = AssetRepo::create_schedule(
        &pool,
        asset.id,
        &CreateMaintenanceSchedule {
            title: "Calibration".to_string(),
            interval_days: 30,
            next_due_on: None,
            assigned_to_id: Some(user_id),
        },
        date(2026, 3, 5),
    )
    .await
    .unwrap();

    let cutoff = date(2026, 3, 8);
    let due = AssetRepo::maintenance_due_for_reminder(&pool, cutoff).await.unwrap();
    assert_eq!(due.len(), 1);
    AssetRepo::mark_schedule_reminded(&pool, schedule.id, due[0].next_due_on)
        .await
        .unwrap();
    assert!(AssetRepo::maintenance_due_for_reminder(&pool, cutoff)
        .await
        .unwrap()
        .is_empty());

    let (schedule, log) = AssetRepo::complete_schedule(
        &pool,
        schedule.id,
        date(2026, 3, 4),
        date(2026, 4, 3),
        user_id,
        Some("ok"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(schedule.next_due_on, date(2026, 4, 3));
    assert_eq!(log.performed_on, date(2026, 3, 4));

    let due = AssetRepo::maintenance_due_for_reminder(&pool, date(2026, 4, 5))
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
}
