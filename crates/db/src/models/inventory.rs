//! Inventory category, item and stock movement models.

use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A row from the `inventory_categories` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryCategory {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A row from the `inventory_items` table. `quantity` is the current balance.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryItem {
    pub id: DbId,
    pub sku: String,
    pub name: String,
    pub category_id: Option<DbId>,
    pub unit: String,
    pub quantity: i32,
    pub min_quantity: i32,
    pub location: Option<String>,
    pub expiry_date: Option<Date>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New items start with a zero balance; stock arrives through transactions.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItem {
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: Option<DbId>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub min_quantity: Option<i32>,
    pub location: Option<String>,
    pub expiry_date: Option<Date>,
}

/// Patch DTO. The balance cannot be patched directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<DbId>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub min_quantity: Option<i32>,
    pub location: Option<String>,
    pub expiry_date: Option<Date>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category_id: Option<DbId>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A row from the `inventory_transactions` ledger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryTransaction {
    pub id: DbId,
    pub item_id: DbId,
    pub txn_type: String,
    pub quantity: i32,
    pub balance_before: i32,
    pub balance_after: i32,
    pub note: Option<String>,
    pub reference: Option<String>,
    pub performed_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// `POST /inventory/items/{id}/transactions` body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTransaction {
    pub txn_type: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

/// Values written to the ledger after the balance has been computed.
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub item_id: DbId,
    pub txn_type: &'a str,
    pub quantity: i32,
    pub balance_before: i32,
    pub balance_after: i32,
    pub note: Option<&'a str>,
    pub reference: Option<&'a str>,
    pub performed_by_id: Option<DbId>,
}

/// Item joined with its category name, used by the export.
#[derive(Debug, Clone, FromRow)]
pub struct ItemExportRow {
    pub sku: String,
    pub name: String,
    pub category_name: Option<String>,
    pub unit: String,
    pub quantity: i32,
    pub min_quantity: i32,
    pub location: Option<String>,
    pub expiry_date: Option<Date>,
}
