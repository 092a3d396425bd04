//! Handlers for cost and revenue entries, summaries and monthly snapshots.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::dates::{month_bounds, period_label, validate_range};
use clinicops_core::export::{ExportFormat, Table};
use clinicops_core::finance::{summarize, validate_amount, FinanceSummary};
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{FINANCE_MANAGE, FINANCE_VIEW};
use clinicops_core::types::{Date, DbId};
use clinicops_db::models::finance::{
    AmountRow, CostEntry, CostSnapshot, CreateCostEntry, CreateRevenueEntry, CreateSnapshot,
    EntryListParams, NewSnapshot, RevenueEntry, SnapshotListParams, SummaryParams,
    UpdateCostEntry, UpdateRevenueEntry,
};
use clinicops_db::repositories::FinanceRepo;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::export;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

/// `?from&to&format` for the summary export.
#[derive(Debug, Deserialize)]
pub struct SummaryExportParams {
    pub from: Date,
    pub to: Date,
    pub format: Option<String>,
}

fn pairs(rows: Vec<AmountRow>) -> Vec<(String, i64)> {
    rows.into_iter().map(|r| (r.key, r.amount_cents)).collect()
}

async fn compute_summary(state: &AppState, from: Date, to: Date) -> AppResult<FinanceSummary> {
    validate_range(from, to)?;
    let costs = FinanceRepo::cost_amounts(&state.pool, from, to).await?;
    let revenues = FinanceRepo::revenue_amounts(&state.pool, from, to).await?;
    Ok(summarize(&pairs(costs), &pairs(revenues))?)
}

fn summary_table(summary: &FinanceSummary) -> Table {
    let mut table = Table::new(["kind", "key", "amount_cents", "share_pct"]);
    for line in &summary.cost_by_category {
        table.push(vec![
            "cost".into(),
            line.key.clone(),
            line.amount_cents.to_string(),
            format!("{:.2}", line.share_pct),
        ]);
    }
    for line in &summary.revenue_by_source {
        table.push(vec![
            "revenue".into(),
            line.key.clone(),
            line.amount_cents.to_string(),
            format!("{:.2}", line.share_pct),
        ]);
    }
    table.push(vec![
        "total".into(),
        "net".into(),
        summary.net_cents.to_string(),
        format!("{:.2}", summary.margin_pct),
    ]);
    table
}

// ---------------------------------------------------------------------------
// Costs
// ---------------------------------------------------------------------------

/// GET /api/finance/costs?page&limit&from&to
pub async fn list_costs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<EntryListParams>,
) -> AppResult<Json<PaginatedResponse<CostEntry>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let page = Page::new(params.page, params.limit);
    let rows = FinanceRepo::list_costs(&state.pool, &params, page).await?;
    let total = FinanceRepo::count_costs(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/finance/costs
pub async fn create_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCostEntry>,
) -> AppResult<(StatusCode, Json<DataResponse<CostEntry>>)> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    input.validate()?;
    validate_amount(input.amount_cents)?;

    let entry = FinanceRepo::create_cost(&state.pool, &input, auth.user_id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::COST_ENTRY,
        Some(entry.id),
        Some(json!({ "category": entry.category, "amount_cents": entry.amount_cents })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/finance/costs/{id}
pub async fn get_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CostEntry>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let entry = FinanceRepo::find_cost(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("CostEntry", id))?;
    Ok(Json(DataResponse { data: entry }))
}

/// PATCH /api/finance/costs/{id}
pub async fn update_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCostEntry>,
) -> AppResult<Json<DataResponse<CostEntry>>> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    input.validate()?;
    if let Some(amount) = input.amount_cents {
        validate_amount(amount)?;
    }

    let entry = FinanceRepo::update_cost(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("CostEntry", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::COST_ENTRY,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/finance/costs/{id}
pub async fn delete_cost(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    if !FinanceRepo::delete_cost(&state.pool, id).await? {
        return Err(AppError::not_found("CostEntry", id));
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::COST_ENTRY,
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

/// GET /api/finance/revenue?page&limit&from&to
pub async fn list_revenue(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<EntryListParams>,
) -> AppResult<Json<PaginatedResponse<RevenueEntry>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let page = Page::new(params.page, params.limit);
    let rows = FinanceRepo::list_revenue(&state.pool, &params, page).await?;
    let total = FinanceRepo::count_revenue(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/finance/revenue
pub async fn create_revenue(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateRevenueEntry>,
) -> AppResult<(StatusCode, Json<DataResponse<RevenueEntry>>)> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    input.validate()?;
    validate_amount(input.amount_cents)?;

    let entry = FinanceRepo::create_revenue(&state.pool, &input, auth.user_id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::REVENUE_ENTRY,
        Some(entry.id),
        Some(json!({ "source": entry.source, "amount_cents": entry.amount_cents })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/finance/revenue/{id}
pub async fn get_revenue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RevenueEntry>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let entry = FinanceRepo::find_revenue(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("RevenueEntry", id))?;
    Ok(Json(DataResponse { data: entry }))
}

/// PATCH /api/finance/revenue/{id}
pub async fn update_revenue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRevenueEntry>,
) -> AppResult<Json<DataResponse<RevenueEntry>>> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    input.validate()?;
    if let Some(amount) = input.amount_cents {
        validate_amount(amount)?;
    }

    let entry = FinanceRepo::update_revenue(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("RevenueEntry", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::REVENUE_ENTRY,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/finance/revenue/{id}
pub async fn delete_revenue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    if !FinanceRepo::delete_revenue(&state.pool, id).await? {
        return Err(AppError::not_found("RevenueEntry", id));
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::REVENUE_ENTRY,
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Summary and snapshots
// ---------------------------------------------------------------------------

/// GET /api/finance/summary?from&to
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<DataResponse<FinanceSummary>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let summary = compute_summary(&state, params.from, params.to).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/finance/summary/export?from&to&format=csv|xlsx
pub async fn export_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SummaryExportParams>,
) -> AppResult<Response> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let format = ExportFormat::from_query(params.format.as_deref())?;
    let summary = compute_summary(&state, params.from, params.to).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::EXPORT,
        entities::COST_SNAPSHOT,
        None,
        Some(json!({ "from": params.from, "to": params.to, "format": format.as_str() })),
    )
    .await;

    let stem = format!("finance-{}-{}", params.from, params.to);
    export::respond(format, &stem, &summary_table(&summary))
}

/// POST /api/finance/snapshots
///
/// Computes the summary for one calendar month and stores it under its
/// `YYYY-MM` period, replacing any earlier snapshot of that month.
pub async fn create_snapshot(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateSnapshot>,
) -> AppResult<(StatusCode, Json<DataResponse<CostSnapshot>>)> {
    require_permission(&state, &auth, FINANCE_MANAGE).await?;
    let (from, to) = month_bounds(input.year, input.month)?;
    let summary = compute_summary(&state, from, to).await?;

    let snapshot = FinanceRepo::upsert_snapshot(
        &state.pool,
        &NewSnapshot {
            period: period_label(input.year, input.month),
            total_cost_cents: summary.total_cost_cents,
            total_revenue_cents: summary.total_revenue_cents,
            net_cents: summary.net_cents,
            margin_pct: summary.margin_pct,
            breakdown_json: json!({
                "cost_by_category": summary.cost_by_category,
                "revenue_by_source": summary.revenue_by_source,
            }),
            created_by_id: Some(auth.user_id),
        },
    )
    .await?;

    tracing::info!(period = %snapshot.period, net_cents = snapshot.net_cents, "Cost snapshot stored");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::COST_SNAPSHOT,
        Some(snapshot.id),
        Some(json!({ "period": snapshot.period })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: snapshot })))
}

/// GET /api/finance/snapshots?year
pub async fn list_snapshots(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SnapshotListParams>,
) -> AppResult<Json<DataResponse<Vec<CostSnapshot>>>> {
    require_permission(&state, &auth, FINANCE_VIEW).await?;
    let rows = FinanceRepo::list_snapshots(&state.pool, params.year).await?;
    Ok(Json(DataResponse { data: rows }))
}
