//! Repository for vendors, purchase requests, purchase orders and goods receipts.
//!
//! Multi-row writes (request + lines, order from request, receipts) take a
//! caller-owned transaction so the API layer can combine them with
//! inventory postings.

use clinicops_core::pagination::Page;
use clinicops_core::procurement::{PurchaseOrderStatus, PurchaseRequestStatus};
use clinicops_core::types::{Date, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::procurement::{
    CreatePurchaseRequest, CreateVendor, GoodsReceipt, GoodsReceiptLine, PurchaseOrder,
    PurchaseOrderLine, PurchaseOrderListParams, PurchaseRequest, PurchaseRequestLine,
    PurchaseRequestListParams, UpdateVendor, Vendor,
};

const VENDOR_COLUMNS: &str = "id, name, contact_name, email, phone, address, is_active, \
                              created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, title, justification, requested_by_id, status, \
                               reviewed_by_id, reviewed_at, review_note, created_at, updated_at";

const REQUEST_LINE_COLUMNS: &str =
    "id, request_id, item_id, description, quantity, estimated_unit_cost_cents";

const ORDER_COLUMNS: &str = "id, po_number, request_id, vendor_id, status, total_cents, \
                             expected_on, issued_by_id, created_at, updated_at";

const ORDER_LINE_COLUMNS: &str =
    "id, order_id, item_id, description, quantity, received_quantity, unit_cost_cents";

const RECEIPT_COLUMNS: &str = "id, order_id, received_by_id, note, created_at";

const RECEIPT_LINE_COLUMNS: &str = "id, receipt_id, order_line_id, quantity";

/// `$1` status, `$2` requester.
const REQUEST_FILTER: &str =
    "($1::TEXT IS NULL OR status = $1) AND ($2::BIGINT IS NULL OR requested_by_id = $2)";

/// `$1` status, `$2` vendor.
const ORDER_FILTER: &str =
    "($1::TEXT IS NULL OR status = $1) AND ($2::BIGINT IS NULL OR vendor_id = $2)";

pub struct ProcurementRepo;

impl ProcurementRepo {
    // -----------------------------------------------------------------------
    // Vendors
    // -----------------------------------------------------------------------

    pub async fn list_vendors(
        pool: &PgPool,
        include_inactive: bool,
    ) -> Result<Vec<Vendor>, sqlx::Error> {
        let query = format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE ($1 OR is_active) ORDER BY name"
        );
        sqlx::query_as::<_, Vendor>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    pub async fn find_vendor(pool: &PgPool, id: DbId) -> Result<Option<Vendor>, sqlx::Error> {
        let query = format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1");
        sqlx::query_as::<_, Vendor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_vendor(pool: &PgPool, input: &CreateVendor) -> Result<Vendor, sqlx::Error> {
        let query = format!(
            "INSERT INTO vendors (name, contact_name, email, phone, address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {VENDOR_COLUMNS}"
        );
        sqlx::query_as::<_, Vendor>(&query)
            .bind(&input.name)
            .bind(&input.contact_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .fetch_one(pool)
            .await
    }

    pub async fn update_vendor(
        pool: &PgPool,
        id: DbId,
        input: &UpdateVendor,
    ) -> Result<Option<Vendor>, sqlx::Error> {
        let query = format!(
            "UPDATE vendors SET
                name = COALESCE($2, name),
                contact_name = COALESCE($3, contact_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                is_active = COALESCE($7, is_active)
             WHERE id = $1
             RETURNING {VENDOR_COLUMNS}"
        );
        sqlx::query_as::<_, Vendor>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.contact_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn deactivate_vendor(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE vendors SET is_active = false WHERE id = $1 AND is_active")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Purchase requests
    // -----------------------------------------------------------------------

    /// Insert a request and its lines in one transaction.
    pub async fn create_request(
        pool: &PgPool,
        requested_by_id: DbId,
        input: &CreatePurchaseRequest,
    ) -> Result<(PurchaseRequest, Vec<PurchaseRequestLine>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO purchase_requests (title, justification, requested_by_id)
             VALUES ($1, $2, $3)
             RETURNING {REQUEST_COLUMNS}"
        );
        let request = sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(&input.title)
            .bind(&input.justification)
            .bind(requested_by_id)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO purchase_request_lines
                (request_id, item_id, description, quantity, estimated_unit_cost_cents)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REQUEST_LINE_COLUMNS}"
        );
        let mut lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let row = sqlx::query_as::<_, PurchaseRequestLine>(&query)
                .bind(request.id)
                .bind(line.item_id)
                .bind(&line.description)
                .bind(line.quantity)
                .bind(line.estimated_unit_cost_cents)
                .fetch_one(&mut *tx)
                .await?;
            lines.push(row);
        }

        tx.commit().await?;
        Ok((request, lines))
    }

    pub async fn find_request(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PurchaseRequest>, sqlx::Error> {
        let query = format!("SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE id = $1");
        sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn request_lines(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<PurchaseRequestLine>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_LINE_COLUMNS} FROM purchase_request_lines WHERE request_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, PurchaseRequestLine>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_requests(
        pool: &PgPool,
        params: &PurchaseRequestListParams,
        requested_by_id: Option<DbId>,
        page: Page,
    ) -> Result<Vec<PurchaseRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE {REQUEST_FILTER}
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(&params.status)
            .bind(requested_by_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_requests(
        pool: &PgPool,
        params: &PurchaseRequestListParams,
        requested_by_id: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let query =
            format!("SELECT COUNT(*)::BIGINT FROM purchase_requests WHERE {REQUEST_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(requested_by_id)
            .fetch_one(pool)
            .await
    }

    /// Move a pending request to `status`. Returns `None` if it is no longer pending.
    pub async fn close_request(
        pool: &PgPool,
        id: DbId,
        status: PurchaseRequestStatus,
        reviewer_id: Option<DbId>,
        note: Option<&str>,
    ) -> Result<Option<PurchaseRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE purchase_requests SET
                status = $2,
                reviewed_by_id = $3,
                reviewed_at = CASE WHEN $3::BIGINT IS NULL THEN NULL ELSE NOW() END,
                review_note = $4
             WHERE id = $1 AND status = 'pending'
             RETURNING {REQUEST_COLUMNS}"
        );
        sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(note)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Purchase orders
    // -----------------------------------------------------------------------

    pub async fn lock_request(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<PurchaseRequest>, sqlx::Error> {
        let query =
            format!("SELECT {REQUEST_COLUMNS} FROM purchase_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, PurchaseRequest>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Next 1-based order sequence for a `PO-YYYYMM-` prefix. Takes a
    /// transaction-scoped advisory lock so numbering is serialized.
    pub async fn next_po_sequence(
        tx: &mut Transaction<'_, Postgres>,
        prefix: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('purchase_orders.po_number'))")
            .execute(&mut **tx)
            .await?;
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM purchase_orders WHERE po_number LIKE $1 || '%'",
        )
        .bind(prefix)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count + 1)
    }

    /// Create an order from a request: copy lines with their estimated cost,
    /// total them and mark the request ordered.
    pub async fn create_order_from_request(
        tx: &mut Transaction<'_, Postgres>,
        request_id: DbId,
        po_number: &str,
        vendor_id: DbId,
        expected_on: Option<Date>,
        issued_by_id: DbId,
    ) -> Result<PurchaseOrder, sqlx::Error> {
        let order_id = sqlx::query_scalar::<_, DbId>(
            "INSERT INTO purchase_orders (po_number, request_id, vendor_id, expected_on, issued_by_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(po_number)
        .bind(request_id)
        .bind(vendor_id)
        .bind(expected_on)
        .bind(issued_by_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO purchase_order_lines (order_id, item_id, description, quantity, unit_cost_cents)
             SELECT $1, item_id, description, quantity, estimated_unit_cost_cents
             FROM purchase_request_lines WHERE request_id = $2 ORDER BY id",
        )
        .bind(order_id)
        .bind(request_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE purchase_requests SET status = $2 WHERE id = $1")
            .bind(request_id)
            .bind(PurchaseRequestStatus::Ordered.as_str())
            .execute(&mut **tx)
            .await?;

        let query = format!(
            "UPDATE purchase_orders SET total_cents = (
                SELECT COALESCE(SUM(quantity::BIGINT * unit_cost_cents), 0)::BIGINT
                FROM purchase_order_lines WHERE order_id = $1
             )
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(order_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_order(pool: &PgPool, id: DbId) -> Result<Option<PurchaseOrder>, sqlx::Error> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1");
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lock_order(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<PurchaseOrder>, sqlx::Error> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn list_orders(
        pool: &PgPool,
        params: &PurchaseOrderListParams,
        page: Page,
    ) -> Result<Vec<PurchaseOrder>, sqlx::Error> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE {ORDER_FILTER}
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(&params.status)
            .bind(params.vendor_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_orders(
        pool: &PgPool,
        params: &PurchaseOrderListParams,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM purchase_orders WHERE {ORDER_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.status)
            .bind(params.vendor_id)
            .fetch_one(pool)
            .await
    }

    pub async fn order_lines(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<PurchaseOrderLine>, sqlx::Error> {
        let query = format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM purchase_order_lines WHERE order_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, PurchaseOrderLine>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Cancel an order that has received nothing yet.
    pub async fn cancel_order(pool: &PgPool, id: DbId) -> Result<Option<PurchaseOrder>, sqlx::Error> {
        let query = format!(
            "UPDATE purchase_orders SET status = 'cancelled'
             WHERE id = $1 AND status = 'issued'
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Goods receipts (transaction-scoped)
    // -----------------------------------------------------------------------

    pub async fn lock_order_lines(
        tx: &mut Transaction<'_, Postgres>,
        order_id: DbId,
    ) -> Result<Vec<PurchaseOrderLine>, sqlx::Error> {
        let query = format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM purchase_order_lines
             WHERE order_id = $1 ORDER BY id FOR UPDATE"
        );
        sqlx::query_as::<_, PurchaseOrderLine>(&query)
            .bind(order_id)
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn insert_receipt(
        tx: &mut Transaction<'_, Postgres>,
        order_id: DbId,
        received_by_id: DbId,
        note: Option<&str>,
    ) -> Result<GoodsReceipt, sqlx::Error> {
        let query = format!(
            "INSERT INTO goods_receipts (order_id, received_by_id, note) VALUES ($1, $2, $3)
             RETURNING {RECEIPT_COLUMNS}"
        );
        sqlx::query_as::<_, GoodsReceipt>(&query)
            .bind(order_id)
            .bind(received_by_id)
            .bind(note)
            .fetch_one(&mut **tx)
            .await
    }

    /// Append a receipt line and bump the order line's received quantity.
    pub async fn insert_receipt_line(
        tx: &mut Transaction<'_, Postgres>,
        receipt_id: DbId,
        order_line_id: DbId,
        quantity: i32,
    ) -> Result<GoodsReceiptLine, sqlx::Error> {
        let query = format!(
            "INSERT INTO goods_receipt_lines (receipt_id, order_line_id, quantity) VALUES ($1, $2, $3)
             RETURNING {RECEIPT_LINE_COLUMNS}"
        );
        let line = sqlx::query_as::<_, GoodsReceiptLine>(&query)
            .bind(receipt_id)
            .bind(order_line_id)
            .bind(quantity)
            .fetch_one(&mut **tx)
            .await?;

        sqlx::query(
            "UPDATE purchase_order_lines SET received_quantity = received_quantity + $2 WHERE id = $1",
        )
        .bind(order_line_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

        Ok(line)
    }

    pub async fn set_order_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: PurchaseOrderStatus,
    ) -> Result<PurchaseOrder, sqlx::Error> {
        let query = format!(
            "UPDATE purchase_orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn receipts_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<GoodsReceipt>, sqlx::Error> {
        let query = format!(
            "SELECT {RECEIPT_COLUMNS} FROM goods_receipts WHERE order_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, GoodsReceipt>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn receipt_lines_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<GoodsReceiptLine>, sqlx::Error> {
        sqlx::query_as::<_, GoodsReceiptLine>(
            "SELECT l.id, l.receipt_id, l.order_line_id, l.quantity
             FROM goods_receipt_lines l
             JOIN goods_receipts r ON r.id = l.receipt_id
             WHERE r.order_id = $1
             ORDER BY l.id",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
    }
}
