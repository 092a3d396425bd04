//! Soft-delete and deactivation behaviour.
//!
//! Handovers carry `deleted_at`; users, inventory items and vendors are
//! deactivated instead of removed so history keeps its references.

use clinicops_core::pagination::Page;
use clinicops_db::models::handover::{CreateHandover, HandoverListParams};
use clinicops_db::models::inventory::{CreateItem, ItemListParams};
use clinicops_db::models::user::CreateUser;
use clinicops_db::repositories::{HandoverRepo, InventoryRepo, UserRepo};
use sqlx::PgPool;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        password_hash: "hash".to_string(),
        full_name: "Soft Delete".to_string(),
        role: "staff".to_string(),
        position: None,
        department: None,
        phone: None,
    }
}

fn new_item(sku: &str) -> CreateItem {
    CreateItem {
        sku: sku.to_string(),
        name: format!("Item {sku}"),
        category_id: None,
        unit: None,
        min_quantity: Some(5),
        location: None,
        expiry_date: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_handover_is_hidden(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("sd@clinic.test")).await.unwrap();
    let h = HandoverRepo::create(
        &pool,
        &CreateHandover {
            title: "Restock crash cart".to_string(),
            description: None,
            priority: Some("high".to_string()),
            shift: None,
            department: None,
            assignee_id: None,
            due_at: None,
        },
        user.id,
    )
    .await
    .unwrap();

    assert!(HandoverRepo::soft_delete(&pool, h.id).await.unwrap());
    assert!(HandoverRepo::find_by_id(&pool, h.id).await.unwrap().is_none());

    let params = HandoverListParams::default();
    let listed = HandoverRepo::list(&pool, &params, None, Page::new(None, None))
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert_eq!(HandoverRepo::count(&pool, &params, None).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_is_idempotent(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("idem@clinic.test")).await.unwrap();
    let h = HandoverRepo::create(
        &pool,
        &CreateHandover {
            title: "Once".to_string(),
            description: None,
            priority: None,
            shift: None,
            department: None,
            assignee_id: None,
            due_at: None,
        },
        user.id,
    )
    .await
    .unwrap();

    assert!(HandoverRepo::soft_delete(&pool, h.id).await.unwrap());
    assert!(!HandoverRepo::soft_delete(&pool, h.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivated_user_is_excluded_from_recipients(pool: PgPool) {
    let kept = UserRepo::create(&pool, &new_user("kept@clinic.test")).await.unwrap();
    let gone = UserRepo::create(&pool, &new_user("gone@clinic.test")).await.unwrap();

    assert!(UserRepo::deactivate(&pool, gone.id).await.unwrap());
    assert!(!UserRepo::deactivate(&pool, gone.id).await.unwrap());

    let ids = UserRepo::active_ids(&pool).await.unwrap();
    assert_eq!(ids, vec![kept.id]);

    // The row itself is still there.
    let row = UserRepo::find_by_id(&pool, gone.id).await.unwrap().unwrap();
    assert!(!row.is_active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivated_item_hidden_unless_requested(pool: PgPool) {
    let item = InventoryRepo::create_item(&pool, &new_item("GLV-001")).await.unwrap();
    InventoryRepo::create_item(&pool, &new_item("GLV-002")).await.unwrap();

    assert!(InventoryRepo::deactivate_item(&pool, item.id).await.unwrap());

    let active = ItemListParams::default();
    assert_eq!(InventoryRepo::count_items(&pool, &active).await.unwrap(), 1);

    let all = ItemListParams {
        include_inactive: true,
        ..Default::default()
    };
    assert_eq!(InventoryRepo::count_items(&pool, &all).await.unwrap(), 2);

    // Inactive items never show up as low stock.
    let low = InventoryRepo::low_stock(&pool).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].sku, "GLV-002");
}
