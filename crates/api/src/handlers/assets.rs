//! Handlers for the asset register, maintenance schedules and fault reports.
//!
//! Any holder of `asset.view` may report a fault. Everything else that
//! writes needs `asset.manage`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinicops_core::assets::{
    next_due, status_after_fault, status_after_resolution, validate_fault_transition,
    validate_interval, AssetStatus, FaultSeverity, FaultStatus, MAINTENANCE_DUE_WINDOW_DAYS,
};
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{ASSET_MANAGE, ASSET_VIEW};
use clinicops_core::roles::ALERT_ROLES;
use clinicops_core::types::DbId;
use clinicops_db::models::asset::{
    Asset, AssetListParams, CompleteMaintenance, CreateAsset, CreateFaultReport,
    CreateMaintenanceSchedule, DueMaintenance, DueParams, FaultListParams, FaultReport,
    FaultStatusChange, MaintenanceLog, MaintenanceSchedule, UpdateAsset,
};
use clinicops_db::repositories::AssetRepo;
use clinicops_events::{Audience, ClinicEvent};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

/// Result of completing a maintenance task.
#[derive(Debug, Serialize)]
pub struct MaintenanceCompletion {
    pub schedule: MaintenanceSchedule,
    pub log: MaintenanceLog,
}

async fn find_asset(state: &AppState, id: DbId) -> AppResult<Asset> {
    AssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Asset", id))
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// GET /api/assets
pub async fn list_assets(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AssetListParams>,
) -> AppResult<Json<PaginatedResponse<Asset>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        AssetStatus::parse(status)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = AssetRepo::list(&state.pool, &params, page).await?;
    let total = AssetRepo::count(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/assets
pub async fn create_asset(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut input): Json<CreateAsset>,
) -> AppResult<(StatusCode, Json<DataResponse<Asset>>)> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    input.validate()?;
    input.asset_tag = input.asset_tag.trim().to_string();

    let asset = AssetRepo::create(&state.pool, &input).await?;

    tracing::info!(asset_id = asset.id, tag = %asset.asset_tag, "Asset registered");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::ASSET,
        Some(asset.id),
        Some(json!({ "asset_tag": asset.asset_tag, "name": asset.name })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Asset>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    let asset = find_asset(&state, id).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// PATCH /api/assets/{id}
pub async fn update_asset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAsset>,
) -> AppResult<Json<DataResponse<Asset>>> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    input.validate()?;
    if let Some(status) = input.status.as_deref() {
        AssetStatus::parse(status)?;
    }

    let asset = AssetRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Asset", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::ASSET,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: asset }))
}

/// DELETE /api/assets/{id}
///
/// Retires the asset. History is kept.
pub async fn retire_asset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    find_asset(&state, id).await?;
    if !AssetRepo::retire(&state.pool, id).await? {
        return Err(AppError::validation("Asset is already retired"));
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::ASSET,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// GET /api/assets/{id}/maintenance
pub async fn list_schedules(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<MaintenanceSchedule>>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    find_asset(&state, asset_id).await?;
    let rows = AssetRepo::schedules_for_asset(&state.pool, asset_id).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/assets/{id}/maintenance
pub async fn create_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
    Json(input): Json<CreateMaintenanceSchedule>,
) -> AppResult<(StatusCode, Json<DataResponse<MaintenanceSchedule>>)> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    input.validate()?;
    validate_interval(input.interval_days)?;

    let asset = find_asset(&state, asset_id).await?;
    if AssetStatus::parse(&asset.status)? == AssetStatus::Retired {
        return Err(AppError::validation("Retired assets cannot be scheduled"));
    }

    let next_due_on = match input.next_due_on {
        Some(date) => date,
        None => next_due(Utc::now().date_naive(), input.interval_days)?,
    };
    let schedule = AssetRepo::create_schedule(&state.pool, asset_id, &input, next_due_on).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::MAINTENANCE_SCHEDULE,
        Some(schedule.id),
        Some(json!({
            "asset_id": asset_id,
            "interval_days": schedule.interval_days,
            "next_due_on": schedule.next_due_on,
        })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: schedule })))
}

/// POST /api/assets/maintenance/{id}/complete
///
/// Records a maintenance log and rolls the schedule forward by its interval.
pub async fn complete_maintenance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<CompleteMaintenance>>,
) -> AppResult<Json<DataResponse<MaintenanceCompletion>>> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    let input = body.map(|Json(b)| b).unwrap_or_default();
    input.validate()?;

    let schedule = AssetRepo::find_schedule(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("MaintenanceSchedule", id))?;
    if !schedule.is_active {
        return Err(AppError::validation("Maintenance schedule is inactive"));
    }

    let today = Utc::now().date_naive();
    let performed_on = input.performed_on.unwrap_or(today);
    if performed_on > today {
        return Err(AppError::validation(
            "Maintenance cannot be recorded in the future",
        ));
    }
    let next_due_on = next_due(performed_on, schedule.interval_days)?;

    let (schedule, log) = AssetRepo::complete_schedule(
        &state.pool,
        id,
        performed_on,
        next_due_on,
        auth.user_id,
        input.notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("MaintenanceSchedule", id))?;

    tracing::info!(
        schedule_id = id,
        asset_id = schedule.asset_id,
        %next_due_on,
        "Maintenance completed"
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::MAINTENANCE_SCHEDULE,
        Some(id),
        Some(json!({ "performed_on": performed_on, "next_due_on": next_due_on })),
    )
    .await;

    Ok(Json(DataResponse {
        data: MaintenanceCompletion { schedule, log },
    }))
}

/// GET /api/assets/maintenance/due?days
pub async fn due_maintenance(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<DueParams>,
) -> AppResult<Json<DataResponse<Vec<DueMaintenance>>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    let days = params.days.unwrap_or(MAINTENANCE_DUE_WINDOW_DAYS);
    if !(0..=365).contains(&days) {
        return Err(AppError::validation("days must be between 0 and 365"));
    }
    let cutoff = Utc::now().date_naive() + chrono::Duration::days(days);
    let rows = AssetRepo::due_maintenance(&state.pool, cutoff).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/assets/{id}/maintenance-logs
pub async fn maintenance_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<MaintenanceLog>>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    find_asset(&state, asset_id).await?;
    let rows = AssetRepo::logs_for_asset(&state.pool, asset_id).await?;
    Ok(Json(DataResponse { data: rows }))
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// GET /api/assets/{id}/faults
pub async fn asset_faults(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<FaultReport>>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    find_asset(&state, asset_id).await?;
    let rows = AssetRepo::faults_for_asset(&state.pool, asset_id).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/assets/faults?status
pub async fn list_faults(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<FaultListParams>,
) -> AppResult<Json<PaginatedResponse<FaultReport>>> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        FaultStatus::parse(status)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = AssetRepo::list_faults(&state.pool, params.status.as_deref(), page).await?;
    let total = AssetRepo::count_faults(&state.pool, params.status.as_deref()).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/assets/{id}/faults
///
/// Critical faults take the asset out of service; high severity puts an
/// active asset under maintenance.
pub async fn report_fault(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
    Json(input): Json<CreateFaultReport>,
) -> AppResult<(StatusCode, Json<DataResponse<FaultReport>>)> {
    require_permission(&state, &auth, ASSET_VIEW).await?;
    input.validate()?;
    let severity = FaultSeverity::parse(&input.severity)?;

    let mut tx = state.pool.begin().await?;
    let asset = AssetRepo::lock(&mut tx, asset_id)
        .await?
        .ok_or_else(|| AppError::not_found("Asset", asset_id))?;
    let current = AssetStatus::parse(&asset.status)?;
    if current == AssetStatus::Retired {
        return Err(AppError::validation(
            "Faults cannot be reported on a retired asset",
        ));
    }
    let new_status = status_after_fault(current, severity);
    let fault = AssetRepo::report_fault(&mut tx, asset_id, auth.user_id, &input, new_status).await?;
    tx.commit().await?;

    if let Some(status) = new_status {
        tracing::warn!(asset_id, %severity, %status, "Asset status changed by fault report");
    }
    state.publish(
        ClinicEvent::new(
            event_types::FAULT_REPORTED,
            format!("{severity} fault: {}", asset.name),
            format!("{} ({}): {}", asset.name, asset.asset_tag, fault.description),
        )
        .with_source(entities::FAULT_REPORT, fault.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::roles(ALERT_ROLES))
        .with_payload(json!({
            "asset_id": asset_id,
            "severity": severity.as_str(),
            "asset_status": new_status.map(AssetStatus::as_str),
        })),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::FAULT_REPORT,
        Some(fault.id),
        Some(json!({ "asset_id": asset_id, "severity": severity.as_str() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: fault })))
}

/// POST /api/assets/faults/{id}/status
///
/// Resolving the last open fault returns an impaired asset to `active`.
pub async fn change_fault_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<FaultStatusChange>,
) -> AppResult<Json<DataResponse<FaultReport>>> {
    require_permission(&state, &auth, ASSET_MANAGE).await?;
    input.validate()?;
    let to = FaultStatus::parse(&input.status)?;

    let mut tx = state.pool.begin().await?;
    let existing = AssetRepo::lock_fault(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("FaultReport", id))?;
    let from = FaultStatus::parse(&existing.status)?;
    validate_fault_transition(from, to)?;

    let asset = AssetRepo::lock(&mut tx, existing.asset_id)
        .await?
        .ok_or_else(|| AppError::not_found("Asset", existing.asset_id))?;
    let fault =
        AssetRepo::set_fault_status(&mut tx, id, to.as_str(), input.resolution_note.as_deref())
            .await?;

    let mut restored = None;
    if to == FaultStatus::Resolved {
        let remaining = AssetRepo::count_unresolved_faults(&mut tx, asset.id).await?;
        restored = status_after_resolution(AssetStatus::parse(&asset.status)?, remaining);
        if let Some(status) = restored {
            AssetRepo::set_status(&mut tx, asset.id, status).await?;
        }
    }
    tx.commit().await?;

    tracing::info!(fault_id = id, %from, %to, asset_id = asset.id, "Fault status changed");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::STATUS_CHANGE,
        entities::FAULT_REPORT,
        Some(id),
        Some(json!({
            "from": from.as_str(),
            "to": to.as_str(),
            "asset_status": restored.map(AssetStatus::as_str),
        })),
    )
    .await;

    Ok(Json(DataResponse { data: fault }))
}
