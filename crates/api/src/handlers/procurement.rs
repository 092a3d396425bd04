//! Handlers for vendors, purchase requests, purchase orders and goods receipts.
//!
//! - `procurement.view`: read vendors, every request and every order.
//! - `procurement.request`: raise requests (and read one's own).
//! - `procurement.approve`: manage vendors, review requests, issue and cancel orders.
//!
//! Receiving goods is open to approvers and to inventory managers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Utc};
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::inventory::TxnType;
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{
    INVENTORY_MANAGE, PROCUREMENT_APPROVE, PROCUREMENT_REQUEST, PROCUREMENT_VIEW,
};
use clinicops_core::procurement::{
    format_po_number, status_after_receipt, total_cents, validate_lines,
    validate_receipt_quantity, LineEstimate, PurchaseOrderStatus, PurchaseRequestStatus,
};
use clinicops_core::roles::ALERT_ROLES;
use clinicops_core::types::DbId;
use clinicops_db::models::procurement::{
    CreateGoodsReceipt, CreateOrderFromRequest, CreatePurchaseRequest, CreateVendor,
    GoodsReceiptDetail, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderListParams,
    PurchaseRequest, PurchaseRequestDetail, PurchaseRequestLine, PurchaseRequestListParams,
    ReviewNote, UpdateVendor, Vendor,
};
use clinicops_db::repositories::ProcurementRepo;
use clinicops_events::{Audience, ClinicEvent};
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::handlers::inventory::apply_movement;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_permission, Permissions};
use crate::query::IncludeInactiveParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn estimates(lines: &[PurchaseRequestLine]) -> Vec<LineEstimate> {
    lines
        .iter()
        .map(|l| LineEstimate {
            quantity: l.quantity,
            unit_cost_cents: l.estimated_unit_cost_cents,
        })
        .collect()
}

fn request_detail(
    request: PurchaseRequest,
    lines: Vec<PurchaseRequestLine>,
) -> AppResult<PurchaseRequestDetail> {
    let estimated_total_cents = total_cents(&estimates(&lines))?;
    Ok(PurchaseRequestDetail {
        request,
        lines,
        estimated_total_cents,
    })
}

async fn find_request(state: &AppState, id: DbId) -> AppResult<PurchaseRequest> {
    ProcurementRepo::find_request(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PurchaseRequest", id))
}

async fn load_order_detail(state: &AppState, order: PurchaseOrder) -> AppResult<PurchaseOrderDetail> {
    let lines = ProcurementRepo::order_lines(&state.pool, order.id).await?;
    let receipts = ProcurementRepo::receipts_for_order(&state.pool, order.id).await?;
    let mut lines_by_receipt: HashMap<DbId, Vec<_>> = HashMap::new();
    for line in ProcurementRepo::receipt_lines_for_order(&state.pool, order.id).await? {
        lines_by_receipt.entry(line.receipt_id).or_default().push(line);
    }

    let receipts = receipts
        .into_iter()
        .map(|receipt| GoodsReceiptDetail {
            lines: lines_by_receipt.remove(&receipt.id).unwrap_or_default(),
            receipt,
        })
        .collect();

    Ok(PurchaseOrderDetail {
        order,
        lines,
        receipts,
    })
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

/// GET /api/procurement/vendors?include_inactive
pub async fn list_vendors(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Vendor>>>> {
    require_permission(&state, &auth, PROCUREMENT_VIEW).await?;
    let vendors = ProcurementRepo::list_vendors(&state.pool, params.include_inactive).await?;
    Ok(Json(DataResponse { data: vendors }))
}

/// POST /api/procurement/vendors
pub async fn create_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateVendor>,
) -> AppResult<(StatusCode, Json<DataResponse<Vendor>>)> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;
    input.validate()?;
    let vendor = ProcurementRepo::create_vendor(&state.pool, &input).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::VENDOR,
        Some(vendor.id),
        Some(json!({ "name": vendor.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: vendor })))
}

/// GET /api/procurement/vendors/{id}
pub async fn get_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vendor>>> {
    require_permission(&state, &auth, PROCUREMENT_VIEW).await?;
    let vendor = ProcurementRepo::find_vendor(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor", id))?;
    Ok(Json(DataResponse { data: vendor }))
}

/// PATCH /api/procurement/vendors/{id}
pub async fn update_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateVendor>,
) -> AppResult<Json<DataResponse<Vendor>>> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;
    input.validate()?;
    let vendor = ProcurementRepo::update_vendor(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::VENDOR,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: vendor }))
}

/// DELETE /api/procurement/vendors/{id}
///
/// Deactivates the vendor; existing orders keep their reference.
pub async fn delete_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;
    if ProcurementRepo::find_vendor(&state.pool, id).await?.is_none() {
        return Err(AppError::not_found("Vendor", id));
    }
    ProcurementRepo::deactivate_vendor(&state.pool, id).await?;

    audit::record(&state, Some(auth.user_id), actions::DELETE, entities::VENDOR, Some(id), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Purchase requests
// ---------------------------------------------------------------------------

/// GET /api/procurement/requests?page&limit&status&mine
///
/// Without `procurement.view` only the caller's own requests are listed.
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PurchaseRequestListParams>,
) -> AppResult<Json<PaginatedResponse<PurchaseRequest>>> {
    if let Some(status) = params.status.as_deref() {
        PurchaseRequestStatus::parse(status)?;
    }
    let perms = Permissions::load(&state.pool, &auth).await?;
    if !perms.has(PROCUREMENT_VIEW) && !perms.has(PROCUREMENT_REQUEST) {
        return Err(AppError::forbidden(format!(
            "Missing permission: {PROCUREMENT_VIEW}"
        )));
    }
    let scope = (params.mine || !perms.has(PROCUREMENT_VIEW)).then_some(auth.user_id);

    let page = Page::new(params.page, params.limit);
    let rows = ProcurementRepo::list_requests(&state.pool, &params, scope, page).await?;
    let total = ProcurementRepo::count_requests(&state.pool, &params, scope).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/procurement/requests
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreatePurchaseRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PurchaseRequestDetail>>)> {
    require_permission(&state, &auth, PROCUREMENT_REQUEST).await?;
    input.validate()?;
    let lines: Vec<LineEstimate> = input
        .lines
        .iter()
        .map(|l| LineEstimate {
            quantity: l.quantity,
            unit_cost_cents: l.estimated_unit_cost_cents,
        })
        .collect();
    validate_lines(&lines)?;

    let (request, lines) = ProcurementRepo::create_request(&state.pool, auth.user_id, &input).await?;
    let detail = request_detail(request, lines)?;

    tracing::info!(
        request_id = detail.request.id,
        total_cents = detail.estimated_total_cents,
        "Purchase request submitted"
    );
    state.publish(
        ClinicEvent::new(
            event_types::PURCHASE_REQUEST_SUBMITTED,
            "Purchase request awaiting approval",
            format!(
                "{} ({} line(s), est. {} cents)",
                detail.request.title,
                detail.lines.len(),
                detail.estimated_total_cents
            ),
        )
        .with_source(entities::PURCHASE_REQUEST, detail.request.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::roles(ALERT_ROLES)),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::PURCHASE_REQUEST,
        Some(detail.request.id),
        Some(json!({
            "title": detail.request.title,
            "estimated_total_cents": detail.estimated_total_cents,
        })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/procurement/requests/{id}
pub async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PurchaseRequestDetail>>> {
    let request = find_request(&state, id).await?;
    if request.requested_by_id != auth.user_id {
        require_permission(&state, &auth, PROCUREMENT_VIEW).await?;
    }
    let lines = ProcurementRepo::request_lines(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: request_detail(request, lines)?,
    }))
}

/// POST /api/procurement/requests/{id}/approve
pub async fn approve_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewNote>>,
) -> AppResult<Json<DataResponse<PurchaseRequest>>> {
    review_request(state, auth, id, PurchaseRequestStatus::Approved, body).await
}

/// POST /api/procurement/requests/{id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<ReviewNote>>,
) -> AppResult<Json<DataResponse<PurchaseRequest>>> {
    review_request(state, auth, id, PurchaseRequestStatus::Rejected, body).await
}

async fn review_request(
    state: AppState,
    auth: AuthUser,
    id: DbId,
    decision: PurchaseRequestStatus,
    body: Option<Json<ReviewNote>>,
) -> AppResult<Json<DataResponse<PurchaseRequest>>> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;
    let note = body.map(|Json(b)| b).unwrap_or_default();
    note.validate()?;

    let existing = find_request(&state, id).await?;
    if existing.requested_by_id == auth.user_id {
        return Err(AppError::forbidden("You cannot review your own purchase request"));
    }
    if PurchaseRequestStatus::parse(&existing.status)? != PurchaseRequestStatus::Pending {
        return Err(AppError::validation(format!(
            "Only pending requests can be reviewed (current: {})",
            existing.status
        )));
    }

    let request = ProcurementRepo::close_request(
        &state.pool,
        id,
        decision,
        Some(auth.user_id),
        note.note.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Purchase request was reviewed concurrently"))?;

    state.publish(
        ClinicEvent::new(
            event_types::PURCHASE_REQUEST_REVIEWED,
            format!("Purchase request {decision}"),
            format!("Your purchase request '{}' was {decision}", request.title),
        )
        .with_source(entities::PURCHASE_REQUEST, request.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::User(request.requested_by_id)),
    );
    let action = match decision {
        PurchaseRequestStatus::Approved => actions::APPROVE,
        _ => actions::REJECT,
    };
    audit::record(
        &state,
        Some(auth.user_id),
        action,
        entities::PURCHASE_REQUEST,
        Some(id),
        Some(json!({ "note": request.review_note })),
    )
    .await;

    Ok(Json(DataResponse { data: request }))
}

/// POST /api/procurement/requests/{id}/cancel
///
/// Requester only, while pending.
pub async fn cancel_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PurchaseRequest>>> {
    let existing = find_request(&state, id).await?;
    if existing.requested_by_id != auth.user_id {
        return Err(AppError::forbidden("Only the requester can cancel a purchase request"));
    }
    if PurchaseRequestStatus::parse(&existing.status)? != PurchaseRequestStatus::Pending {
        return Err(AppError::validation(format!(
            "Only pending requests can be cancelled (current: {})",
            existing.status
        )));
    }

    let request = ProcurementRepo::close_request(
        &state.pool,
        id,
        PurchaseRequestStatus::Cancelled,
        None,
        None,
    )
    .await?
    .ok_or_else(|| AppError::conflict("Purchase request was reviewed concurrently"))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CANCEL,
        entities::PURCHASE_REQUEST,
        Some(id),
        None,
    )
    .await;

    Ok(Json(DataResponse { data: request }))
}

/// POST /api/procurement/requests/{id}/order
///
/// Issues a purchase order numbered `PO-YYYYMM-NNNN` from an approved request.
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<DbId>,
    Json(input): Json<CreateOrderFromRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<PurchaseOrderDetail>>)> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;

    let vendor = ProcurementRepo::find_vendor(&state.pool, input.vendor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Vendor", input.vendor_id))?;
    if !vendor.is_active {
        return Err(AppError::validation(format!(
            "Vendor '{}' is inactive",
            vendor.name
        )));
    }

    let mut tx = state.pool.begin().await?;
    let request = ProcurementRepo::lock_request(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::not_found("PurchaseRequest", request_id))?;
    if PurchaseRequestStatus::parse(&request.status)? != PurchaseRequestStatus::Approved {
        return Err(AppError::validation(format!(
            "Only approved requests can be ordered (current: {})",
            request.status
        )));
    }

    let now = Utc::now();
    let prefix = format!("PO-{:04}{:02}-", now.year(), now.month());
    let seq = ProcurementRepo::next_po_sequence(&mut tx, &prefix).await?;
    let po_number = format_po_number(now.year(), now.month(), seq);

    let order = ProcurementRepo::create_order_from_request(
        &mut tx,
        request_id,
        &po_number,
        vendor.id,
        input.expected_on,
        auth.user_id,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        po_number = %order.po_number,
        total_cents = order.total_cents,
        "Purchase order issued"
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::PURCHASE_ORDER,
        Some(order.id),
        Some(json!({
            "po_number": order.po_number,
            "request_id": request_id,
            "vendor_id": vendor.id,
            "total_cents": order.total_cents,
        })),
    )
    .await;

    let detail = load_order_detail(&state, order).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

// ---------------------------------------------------------------------------
// Purchase orders
// ---------------------------------------------------------------------------

/// GET /api/procurement/orders?page&limit&status&vendor_id
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PurchaseOrderListParams>,
) -> AppResult<Json<PaginatedResponse<PurchaseOrder>>> {
    require_permission(&state, &auth, PROCUREMENT_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        PurchaseOrderStatus::parse(status)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = ProcurementRepo::list_orders(&state.pool, &params, page).await?;
    let total = ProcurementRepo::count_orders(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// GET /api/procurement/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PurchaseOrderDetail>>> {
    require_permission(&state, &auth, PROCUREMENT_VIEW).await?;
    let order = ProcurementRepo::find_order(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PurchaseOrder", id))?;
    let detail = load_order_detail(&state, order).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/procurement/orders/{id}/cancel
///
/// Only orders with nothing received can be cancelled.
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PurchaseOrder>>> {
    require_permission(&state, &auth, PROCUREMENT_APPROVE).await?;
    let existing = ProcurementRepo::find_order(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("PurchaseOrder", id))?;
    if !PurchaseOrderStatus::parse(&existing.status)?.can_cancel() {
        return Err(AppError::validation(format!(
            "Order {} is {} and can no longer be cancelled",
            existing.po_number, existing.status
        )));
    }

    let order = ProcurementRepo::cancel_order(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::conflict("Order changed concurrently"))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CANCEL,
        entities::PURCHASE_ORDER,
        Some(id),
        Some(json!({ "po_number": order.po_number })),
    )
    .await;

    Ok(Json(DataResponse { data: order }))
}

/// POST /api/procurement/orders/{id}/receipts
///
/// Records a goods receipt. Lines linked to an inventory item post an `in`
/// stock movement in the same transaction, and the order status is
/// recomputed from the received quantities.
pub async fn receive_goods(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateGoodsReceipt>,
) -> AppResult<(StatusCode, Json<DataResponse<PurchaseOrderDetail>>)> {
    let perms = Permissions::load(&state.pool, &auth).await?;
    if !perms.has(PROCUREMENT_APPROVE) && !perms.has(INVENTORY_MANAGE) {
        return Err(AppError::forbidden(format!(
            "Missing permission: {PROCUREMENT_APPROVE}"
        )));
    }
    input.validate()?;

    let mut tx = state.pool.begin().await?;
    let order = ProcurementRepo::lock_order(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("PurchaseOrder", id))?;
    let status = PurchaseOrderStatus::parse(&order.status)?;
    if !status.accepts_receipts() {
        return Err(AppError::validation(format!(
            "Order {} is {status} and cannot receive goods",
            order.po_number
        )));
    }

    let mut lines: HashMap<DbId, _> = ProcurementRepo::lock_order_lines(&mut tx, id)
        .await?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();

    let receipt = ProcurementRepo::insert_receipt(&mut tx, id, auth.user_id, input.note.as_deref())
        .await?;
    let reference = format!("{} receipt #{}", order.po_number, receipt.id);

    for received in &input.lines {
        let line = lines.get_mut(&received.order_line_id).ok_or_else(|| {
            AppError::validation(format!(
                "Line {} does not belong to order {}",
                received.order_line_id, order.po_number
            ))
        })?;
        validate_receipt_quantity(line.quantity, line.received_quantity, received.quantity)?;

        ProcurementRepo::insert_receipt_line(&mut tx, receipt.id, line.id, received.quantity)
            .await?;
        line.received_quantity += received.quantity;

        if let Some(item_id) = line.item_id {
            apply_movement(
                &mut tx,
                item_id,
                TxnType::In,
                received.quantity,
                Some(&line.description),
                Some(&reference),
                auth.user_id,
            )
            .await?;
        }
    }

    let progress: Vec<(i32, i32)> = lines
        .values()
        .map(|l| (l.quantity, l.received_quantity))
        .collect();
    let new_status = status_after_receipt(&progress);
    let order = ProcurementRepo::set_order_status(&mut tx, id, new_status).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = id,
        receipt_id = receipt.id,
        status = %new_status,
        "Goods received"
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::RECEIVE,
        entities::PURCHASE_ORDER,
        Some(id),
        Some(json!({
            "receipt_id": receipt.id,
            "lines": input.lines.len(),
            "status": new_status.as_str(),
        })),
    )
    .await;

    let detail = load_order_detail(&state, order).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}
