//! Handlers for inventory categories, items and stock movements.
//!
//! Reads require `inventory.view`; writes require `inventory.manage`.
//! Every stock movement locks its item row, updates the balance and appends
//! to the ledger inside one database transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::export::{opt, ExportFormat, Table};
use clinicops_core::inventory::{
    apply_transaction, crossed_low_stock, validate_min_quantity, validate_sku, TxnType,
};
use clinicops_core::permissions::{INVENTORY_MANAGE, INVENTORY_VIEW};
use clinicops_core::roles::ALERT_ROLES;
use clinicops_core::types::DbId;
use clinicops_db::models::inventory::{
    CreateCategory, CreateItem, CreateTransaction, InventoryCategory, InventoryItem,
    InventoryTransaction, ItemListParams, NewTransaction, UpdateCategory, UpdateItem,
};
use clinicops_db::repositories::InventoryRepo;
use clinicops_events::{Audience, ClinicEvent};
use serde_json::json;
use sqlx::{Postgres, Transaction};
use validator::Validate;

use crate::audit;
use crate::cache::KEY_INVENTORY_CATEGORIES;
use crate::error::{AppError, AppResult};
use crate::export;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::query::{FormatParams, PaginationParams};
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Stock movement core (shared with goods receipts)
// ---------------------------------------------------------------------------

/// Outcome of a single stock movement.
pub struct Movement {
    pub transaction: InventoryTransaction,
    pub item: InventoryItem,
    /// The movement took the balance from above the reorder level to at or below it.
    pub crossed_low_stock: bool,
}

/// Lock the item, apply the movement and append it to the ledger. The
/// caller owns (and commits) the transaction.
pub async fn apply_movement(
    tx: &mut Transaction<'_, Postgres>,
    item_id: DbId,
    txn_type: TxnType,
    quantity: i32,
    note: Option<&str>,
    reference: Option<&str>,
    performed_by_id: DbId,
) -> AppResult<Movement> {
    let mut item = InventoryRepo::lock_item(tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("InventoryItem", item_id))?;
    if !item.is_active {
        return Err(AppError::validation(format!(
            "Item {} is inactive",
            item.sku
        )));
    }

    let before = item.quantity;
    let after = apply_transaction(before, txn_type, quantity)?;
    InventoryRepo::set_quantity(tx, item_id, after).await?;

    let transaction = InventoryRepo::insert_transaction(
        tx,
        &NewTransaction {
            item_id,
            txn_type: txn_type.as_str(),
            quantity,
            balance_before: before,
            balance_after: after,
            note,
            reference,
            performed_by_id: Some(performed_by_id),
        },
    )
    .await?;

    item.quantity = after;
    Ok(Movement {
        transaction,
        crossed_low_stock: crossed_low_stock(before, after, item.min_quantity),
        item,
    })
}

/// Alert admins and managers that an item has reached its reorder level.
pub fn publish_low_stock(state: &AppState, item: &InventoryItem, actor: DbId) {
    tracing::warn!(
        item_id = item.id,
        sku = %item.sku,
        quantity = item.quantity,
        min_quantity = item.min_quantity,
        "Item reached low stock"
    );
    state.publish(
        ClinicEvent::new(
            event_types::INVENTORY_LOW_STOCK,
            format!("Low stock: {}", item.name),
            format!(
                "{} ({}) is at {} {} (minimum {})",
                item.name, item.sku, item.quantity, item.unit, item.min_quantity
            ),
        )
        .with_source(entities::INVENTORY_ITEM, item.id)
        .with_actor(actor)
        .with_audience(Audience::roles(ALERT_ROLES))
        .with_payload(json!({ "quantity": item.quantity, "min_quantity": item.min_quantity })),
    );
}

async fn find_item(state: &AppState, id: DbId) -> AppResult<InventoryItem> {
    InventoryRepo::find_item(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("InventoryItem", id))
}

async fn ensure_category_exists(state: &AppState, category_id: Option<DbId>) -> AppResult<()> {
    if let Some(id) = category_id {
        if InventoryRepo::find_category(&state.pool, id).await?.is_none() {
            return Err(AppError::not_found("InventoryCategory", id));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// GET /api/inventory/categories
///
/// Served from the TTL cache when warm.
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<InventoryCategory>>>> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;

    if let Some(cached) = state
        .cache
        .get::<Vec<InventoryCategory>>(KEY_INVENTORY_CATEGORIES)
    {
        return Ok(Json(DataResponse { data: cached }));
    }

    let seen = state.cache.generation(KEY_INVENTORY_CATEGORIES);
    let categories = InventoryRepo::list_categories(&state.pool).await?;
    state.cache.insert(KEY_INVENTORY_CATEGORIES, seen, &categories);
    Ok(Json(DataResponse { data: categories }))
}

/// POST /api/inventory/categories
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<DataResponse<InventoryCategory>>)> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    input.validate()?;

    let category = InventoryRepo::create_category(&state.pool, &input).await?;
    state.cache.invalidate(KEY_INVENTORY_CATEGORIES);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::INVENTORY_CATEGORY,
        Some(category.id),
        Some(json!({ "name": category.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// PATCH /api/inventory/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<Json<DataResponse<InventoryCategory>>> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    input.validate()?;

    let category = InventoryRepo::update_category(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("InventoryCategory", id))?;
    state.cache.invalidate(KEY_INVENTORY_CATEGORIES);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::INVENTORY_CATEGORY,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/inventory/categories/{id}
///
/// A category that still has items cannot be deleted.
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;

    let in_use = InventoryRepo::count_items_in_category(&state.pool, id).await?;
    if in_use > 0 {
        return Err(AppError::conflict(format!(
            "Category still has {in_use} item(s)"
        )));
    }
    if !InventoryRepo::delete_category(&state.pool, id).await? {
        return Err(AppError::not_found("InventoryCategory", id));
    }
    state.cache.invalidate(KEY_INVENTORY_CATEGORIES);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::INVENTORY_CATEGORY,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// GET /api/inventory/items
pub async fn list_items(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ItemListParams>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;
    let page = clinicops_core::pagination::Page::new(params.page, params.limit);
    let items = InventoryRepo::list_items(&state.pool, &params, page).await?;
    let total = InventoryRepo::count_items(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(items, page, total)))
}

/// GET /api/inventory/items/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<InventoryItem>>>> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;
    let items = InventoryRepo::low_stock(&state.pool).await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/inventory/items
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut input): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<DataResponse<InventoryItem>>)> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    input.validate()?;
    input.sku = input.sku.trim().to_string();
    validate_sku(&input.sku)?;
    if let Some(min) = input.min_quantity {
        validate_min_quantity(min)?;
    }
    ensure_category_exists(&state, input.category_id).await?;

    let item = InventoryRepo::create_item(&state.pool, &input).await?;

    tracing::info!(item_id = item.id, sku = %item.sku, "Inventory item created");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::INVENTORY_ITEM,
        Some(item.id),
        Some(json!({ "sku": item.sku, "name": item.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// GET /api/inventory/items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<InventoryItem>>> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;
    let item = find_item(&state, id).await?;
    Ok(Json(DataResponse { data: item }))
}

/// PATCH /api/inventory/items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateItem>,
) -> AppResult<Json<DataResponse<InventoryItem>>> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    input.validate()?;
    if let Some(min) = input.min_quantity {
        validate_min_quantity(min)?;
    }
    ensure_category_exists(&state, input.category_id).await?;

    let item = InventoryRepo::update_item(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("InventoryItem", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::INVENTORY_ITEM,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/inventory/items/{id}
///
/// Soft delete: the item is deactivated and keeps its ledger.
pub async fn delete_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    find_item(&state, id).await?;
    InventoryRepo::deactivate_item(&state.pool, id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::INVENTORY_ITEM,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// POST /api/inventory/items/{id}/transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateTransaction>,
) -> AppResult<(StatusCode, Json<DataResponse<InventoryTransaction>>)> {
    require_permission(&state, &auth, INVENTORY_MANAGE).await?;
    input.validate()?;
    let txn_type = TxnType::parse(&input.txn_type)?;

    let mut tx = state.pool.begin().await?;
    let movement = apply_movement(
        &mut tx,
        id,
        txn_type,
        input.quantity,
        input.note.as_deref(),
        input.reference.as_deref(),
        auth.user_id,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        item_id = id,
        txn_type = %txn_type,
        quantity = input.quantity,
        balance_after = movement.transaction.balance_after,
        user_id = auth.user_id,
        "Stock movement recorded"
    );
    if movement.crossed_low_stock {
        publish_low_stock(&state, &movement.item, auth.user_id);
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::STOCK_MOVEMENT,
        entities::INVENTORY_ITEM,
        Some(id),
        Some(json!({
            "txn_type": txn_type.as_str(),
            "quantity": input.quantity,
            "balance_before": movement.transaction.balance_before,
            "balance_after": movement.transaction.balance_after,
        })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: movement.transaction,
        }),
    ))
}

/// GET /api/inventory/items/{id}/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PaginatedResponse<InventoryTransaction>>> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;
    find_item(&state, id).await?;

    let page = params.page();
    let rows = InventoryRepo::list_transactions(&state.pool, id, page).await?;
    let total = InventoryRepo::count_transactions(&state.pool, id).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// GET /api/inventory/export?format=csv|xlsx
pub async fn export_items(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<FormatParams>,
) -> AppResult<Response> {
    require_permission(&state, &auth, INVENTORY_VIEW).await?;
    let format = ExportFormat::from_query(params.format.as_deref())?;

    let rows = InventoryRepo::export_rows(&state.pool).await?;
    let mut table = Table::new([
        "sku",
        "name",
        "category",
        "unit",
        "quantity",
        "min_quantity",
        "low_stock",
        "location",
        "expiry_date",
    ]);
    for row in &rows {
        table.push(vec![
            row.sku.clone(),
            row.name.clone(),
            row.category_name.clone().unwrap_or_default(),
            row.unit.clone(),
            row.quantity.to_string(),
            row.min_quantity.to_string(),
            if row.quantity <= row.min_quantity { "yes" } else { "no" }.to_string(),
            row.location.clone().unwrap_or_default(),
            opt(row.expiry_date),
        ]);
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::EXPORT,
        entities::INVENTORY_ITEM,
        None,
        Some(json!({ "format": format.as_str(), "rows": rows.len() })),
    )
    .await;

    export::respond(format, "inventory", &table)
}
