//! Vendor, purchase request, purchase order and goods receipt models.

use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

/// A row from the `vendors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Vendor {
    pub id: DbId,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVendor {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateVendor {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Purchase requests
// ---------------------------------------------------------------------------

/// A row from the `purchase_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseRequest {
    pub id: DbId,
    pub title: String,
    pub justification: Option<String>,
    pub requested_by_id: DbId,
    pub status: String,
    pub reviewed_by_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `purchase_request_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseRequestLine {
    pub id: DbId,
    pub request_id: DbId,
    pub item_id: Option<DbId>,
    pub description: String,
    pub quantity: i32,
    pub estimated_unit_cost_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRequestLine {
    pub item_id: Option<DbId>,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1, max = 1_000_000))]
    pub quantity: i32,
    #[validate(range(min = 0, max = 100_000_000_000i64))]
    pub estimated_unit_cost_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub justification: Option<String>,
    #[validate(nested)]
    pub lines: Vec<CreateRequestLine>,
}

/// Request with its lines and estimated total.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequestDetail {
    #[serde(flatten)]
    pub request: PurchaseRequest,
    pub lines: Vec<PurchaseRequestLine>,
    pub estimated_total_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseRequestListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    #[serde(default)]
    pub mine: bool,
}

/// `{note}` body for approve/reject/cancel.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewNote {
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Purchase orders
// ---------------------------------------------------------------------------

/// A row from the `purchase_orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseOrder {
    pub id: DbId,
    pub po_number: String,
    pub request_id: Option<DbId>,
    pub vendor_id: DbId,
    pub status: String,
    pub total_cents: i64,
    pub expected_on: Option<Date>,
    pub issued_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `purchase_order_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseOrderLine {
    pub id: DbId,
    pub order_id: DbId,
    pub item_id: Option<DbId>,
    pub description: String,
    pub quantity: i32,
    pub received_quantity: i32,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderFromRequest {
    pub vendor_id: DbId,
    pub expected_on: Option<Date>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub vendor_id: Option<DbId>,
}

/// Order with its lines and receipts.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
    pub receipts: Vec<GoodsReceiptDetail>,
}

// ---------------------------------------------------------------------------
// Goods receipts
// ---------------------------------------------------------------------------

/// A row from the `goods_receipts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GoodsReceipt {
    pub id: DbId,
    pub order_id: DbId,
    pub received_by_id: Option<DbId>,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `goods_receipt_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GoodsReceiptLine {
    pub id: DbId,
    pub receipt_id: DbId,
    pub order_line_id: DbId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoodsReceiptDetail {
    #[serde(flatten)]
    pub receipt: GoodsReceipt,
    pub lines: Vec<GoodsReceiptLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveLine {
    pub order_line_id: DbId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGoodsReceipt {
    #[validate(length(min = 1))]
    pub lines: Vec<ReceiveLine>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}
