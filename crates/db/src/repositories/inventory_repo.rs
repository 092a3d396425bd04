//! Repository for inventory categories, items and the transaction ledger.
//!
//! Stock movements lock the item row (`SELECT ... FOR UPDATE`), update the
//! balance and append the ledger row inside one transaction owned by the
//! caller.

use clinicops_core::pagination::Page;
use clinicops_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::inventory::{
    CreateCategory, CreateItem, InventoryCategory, InventoryItem, InventoryTransaction,
    ItemExportRow, ItemListParams, NewTransaction, UpdateCategory, UpdateItem,
};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sku, name, category_id, unit, quantity, min_quantity, \
                            location, expiry_date, is_active, created_at, updated_at";

const TXN_COLUMNS: &str = "id, item_id, txn_type, quantity, balance_before, balance_after, \
                           note, reference, performed_by_id, created_at";

/// `$1` search, `$2` category, `$3` low stock only, `$4` include inactive.
const ITEM_FILTER: &str = "($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR sku ILIKE '%' || $1 || '%') \
     AND ($2::BIGINT IS NULL OR category_id = $2) \
     AND (NOT $3 OR quantity <= min_quantity) \
     AND ($4 OR is_active)";

pub struct InventoryRepo;

impl InventoryRepo {
    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub async fn list_categories(pool: &PgPool) -> Result<Vec<InventoryCategory>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM inventory_categories ORDER BY name");
        sqlx::query_as::<_, InventoryCategory>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_category(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<InventoryCategory>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM inventory_categories WHERE id = $1");
        sqlx::query_as::<_, InventoryCategory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_category(
        pool: &PgPool,
        input: &CreateCategory,
    ) -> Result<InventoryCategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_categories (name, description) VALUES ($1, $2)
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryCategory>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn update_category(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCategory,
    ) -> Result<Option<InventoryCategory>, sqlx::Error> {
        let query = format!(
            "UPDATE inventory_categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryCategory>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Number of items (active or not) still filed under a category.
    pub async fn count_items_in_category(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM inventory_items WHERE category_id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete_category(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inventory_categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Insert an item with a zero balance.
    pub async fn create_item(
        pool: &PgPool,
        input: &CreateItem,
    ) -> Result<InventoryItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_items (sku, name, category_id, unit, min_quantity, location, expiry_date)
             VALUES ($1, $2, $3, COALESCE($4, 'unit'), COALESCE($5, 0), $6, $7)
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(&input.sku)
            .bind(&input.name)
            .bind(input.category_id)
            .bind(&input.unit)
            .bind(input.min_quantity)
            .bind(&input.location)
            .bind(input.expiry_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_item(pool: &PgPool, id: DbId) -> Result<Option<InventoryItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1");
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_items(
        pool: &PgPool,
        params: &ItemListParams,
        page: Page,
    ) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE {ITEM_FILTER}
             ORDER BY name, id LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(&params.search)
            .bind(params.category_id)
            .bind(params.low_stock)
            .bind(params.include_inactive)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_items(pool: &PgPool, params: &ItemListParams) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM inventory_items WHERE {ITEM_FILTER}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(&params.search)
            .bind(params.category_id)
            .bind(params.low_stock)
            .bind(params.include_inactive)
            .fetch_one(pool)
            .await
    }

    /// Active items at or below their minimum, most depleted first.
    pub async fn low_stock(pool: &PgPool) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items
             WHERE is_active AND quantity <= min_quantity
             ORDER BY (quantity - min_quantity), name"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn update_item(
        pool: &PgPool,
        id: DbId,
        input: &UpdateItem,
    ) -> Result<Option<InventoryItem>, sqlx::Error> {
        let query = format!(
            "UPDATE inventory_items SET
                name = COALESCE($2, name),
                category_id = COALESCE($3, category_id),
                unit = COALESCE($4, unit),
                min_quantity = COALESCE($5, min_quantity),
                location = COALESCE($6, location),
                expiry_date = COALESCE($7, expiry_date),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.category_id)
            .bind(&input.unit)
            .bind(input.min_quantity)
            .bind(&input.location)
            .bind(input.expiry_date)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Items are deactivated rather than deleted so the ledger stays intact.
    pub async fn deactivate_item(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE inventory_items SET is_active = false WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active items with category names, for CSV/XLSX export.
    pub async fn export_rows(pool: &PgPool) -> Result<Vec<ItemExportRow>, sqlx::Error> {
        sqlx::query_as::<_, ItemExportRow>(
            "SELECT i.sku, i.name, c.name AS category_name, i.unit, i.quantity,
                    i.min_quantity, i.location, i.expiry_date
             FROM inventory_items i
             LEFT JOIN inventory_categories c ON c.id = i.category_id
             WHERE i.is_active
             ORDER BY i.sku",
        )
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Stock movements (transaction-scoped)
    // -----------------------------------------------------------------------

    /// Lock an item row for the remainder of the transaction.
    pub async fn lock_item(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<InventoryItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn set_quantity(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE inventory_items SET quantity = $2 WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn insert_transaction(
        tx: &mut Transaction<'_, Postgres>,
        input: &NewTransaction<'_>,
    ) -> Result<InventoryTransaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_transactions
                (item_id, txn_type, quantity, balance_before, balance_after, note, reference, performed_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TXN_COLUMNS}"
        );
        sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(input.item_id)
            .bind(input.txn_type)
            .bind(input.quantity)
            .bind(input.balance_before)
            .bind(input.balance_after)
            .bind(input.note)
            .bind(input.reference)
            .bind(input.performed_by_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn list_transactions(
        pool: &PgPool,
        item_id: DbId,
        page: Page,
    ) -> Result<Vec<InventoryTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {TXN_COLUMNS} FROM inventory_transactions
             WHERE item_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(item_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn count_transactions(pool: &PgPool, item_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM inventory_transactions WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_one(pool)
        .await
    }
}
