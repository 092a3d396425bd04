//! Handlers for shift definitions, schedule entries and the monthly grid.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use clinicops_core::audit::{actions, entities};
use clinicops_core::dates::{month_bounds, validate_range};
use clinicops_core::export::{ExportFormat, Table};
use clinicops_core::permissions::{SCHEDULE_MANAGE, SCHEDULE_VIEW};
use clinicops_core::scheduling::{
    build_month_grid, credited_hours, periods_conflict, validate_shift_code, validate_shift_times,
    ActivityPeriod, GridEntry, GridStaff, MonthGrid, ShiftInfo,
};
use clinicops_core::types::DbId;
use clinicops_db::models::scheduling::{
    BulkUpsertEntries, CreateShift, DateRangeQuery, GridQuery, ScheduleEntry, Shift, UpdateShift,
    UpsertEntry,
};
use clinicops_db::repositories::ScheduleRepo;
use serde_json::json;
use sqlx::{Postgres, Transaction};
use validator::Validate;

use crate::audit;
use crate::cache::KEY_SHIFTS;
use crate::error::{AppError, AppResult};
use crate::export;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::require_permission;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default window for `GET /schedules/me` when no range is given.
const DEFAULT_ME_WINDOW_DAYS: i64 = 31;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shift catalog, served from the TTL cache when warm.
async fn shift_catalog(state: &AppState) -> AppResult<Vec<Shift>> {
    if let Some(cached) = state.cache.get::<Vec<Shift>>(KEY_SHIFTS) {
        return Ok(cached);
    }
    let seen = state.cache.generation(KEY_SHIFTS);
    let shifts = ScheduleRepo::list_shifts(&state.pool).await?;
    state.cache.insert(KEY_SHIFTS, seen, &shifts);
    Ok(shifts)
}

fn shift_infos(shifts: &[Shift]) -> HashMap<String, ShiftInfo> {
    shifts
        .iter()
        .map(|s| {
            (
                s.code.clone(),
                ShiftInfo {
                    hours: credited_hours(s.is_working, s.start_time, s.end_time),
                    is_working: s.is_working,
                },
            )
        })
        .collect()
}

/// Write one entry inside the caller's transaction.
///
/// The same period on the same day is replaced; a different period that
/// collides (anything against `full_day`) is a conflict. Working shifts
/// cannot be placed on a day covered by approved leave.
async fn upsert_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    input: &UpsertEntry,
    known_codes: &HashMap<String, ShiftInfo>,
    actor: DbId,
) -> AppResult<ScheduleEntry> {
    let Some(shift) = known_codes.get(&input.shift_code) else {
        return Err(AppError::validation(format!(
            "Unknown shift code '{}'",
            input.shift_code
        )));
    };
    let period = input
        .period
        .as_deref()
        .map(ActivityPeriod::parse)
        .transpose()?
        .unwrap_or(ActivityPeriod::FullDay);

    if shift.is_working {
        if let Some(leave_type) =
            ScheduleRepo::approved_leave_on(tx, input.user_id, input.work_date).await?
        {
            return Err(AppError::conflict(format!(
                "User {} is on approved {} leave on {}",
                input.user_id, leave_type, input.work_date
            )));
        }
    }

    let existing = ScheduleRepo::day_entries(tx, input.user_id, input.work_date).await?;
    for entry in &existing {
        let other = ActivityPeriod::parse(&entry.period)?;
        if other != period && periods_conflict(other, period) {
            return Err(AppError::conflict(format!(
                "User {} already has a {} entry on {}",
                input.user_id, other, input.work_date
            )));
        }
    }

    Ok(ScheduleRepo::upsert_entry(tx, input, period.as_str(), actor).await?)
}

async fn load_grid(state: &AppState, query: &GridQuery) -> AppResult<MonthGrid> {
    let (first, last) = month_bounds(query.year, query.month)?;

    let staff_rows =
        ScheduleRepo::grid_staff(&state.pool, query.department.as_deref(), query.position.as_deref())
            .await?;
    let user_ids: Vec<DbId> = staff_rows.iter().map(|s| s.id).collect();
    let entries = ScheduleRepo::entries_for_users(&state.pool, &user_ids, first, last).await?;
    let shifts = shift_catalog(state).await?;

    let staff: Vec<GridStaff> = staff_rows
        .into_iter()
        .map(|s| GridStaff {
            user_id: s.id,
            full_name: s.full_name,
            position: s.position,
            department: s.department,
        })
        .collect();
    let entries: Vec<GridEntry> = entries
        .into_iter()
        .map(|e| GridEntry {
            id: e.id,
            user_id: e.user_id,
            work_date: e.work_date,
            shift_code: e.shift_code,
            period: e.period,
            note: e.note,
        })
        .collect();

    Ok(build_month_grid(
        query.year,
        query.month,
        &staff,
        &entries,
        &shift_infos(&shifts),
    )?)
}

// ---------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------

/// GET /api/schedules/shifts
pub async fn list_shifts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Shift>>>> {
    require_permission(&state, &auth, SCHEDULE_VIEW).await?;
    let shifts = shift_catalog(&state).await?;
    Ok(Json(DataResponse { data: shifts }))
}

/// POST /api/schedules/shifts
pub async fn create_shift(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut input): Json<CreateShift>,
) -> AppResult<(StatusCode, Json<DataResponse<Shift>>)> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;
    input.validate()?;
    input.code = input.code.trim().to_uppercase();
    validate_shift_code(&input.code)?;
    validate_shift_times(input.is_working, input.start_time, input.end_time)?;

    let shift = ScheduleRepo::create_shift(&state.pool, &input).await?;
    state.cache.invalidate(KEY_SHIFTS);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::SHIFT,
        Some(shift.id),
        Some(json!({ "code": shift.code })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: shift })))
}

/// PATCH /api/schedules/shifts/{id}
pub async fn update_shift(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateShift>,
) -> AppResult<Json<DataResponse<Shift>>> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;
    input.validate()?;

    let existing = ScheduleRepo::find_shift(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Shift", id))?;
    validate_shift_times(
        input.is_working.unwrap_or(existing.is_working),
        input.start_time.or(existing.start_time),
        input.end_time.or(existing.end_time),
    )?;

    let shift = ScheduleRepo::update_shift(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Shift", id))?;
    state.cache.invalidate(KEY_SHIFTS);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::SHIFT,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: shift }))
}

/// DELETE /api/schedules/shifts/{id}
///
/// Codes still referenced by schedule entries cannot be deleted.
pub async fn delete_shift(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;

    let shift = ScheduleRepo::find_shift(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Shift", id))?;
    let in_use = ScheduleRepo::count_entries_with_code(&state.pool, &shift.code).await?;
    if in_use > 0 {
        return Err(AppError::conflict(format!(
            "Shift code {} is used by {in_use} schedule entr(ies)",
            shift.code
        )));
    }

    ScheduleRepo::delete_shift(&state.pool, id).await?;
    state.cache.invalidate(KEY_SHIFTS);

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::SHIFT,
        Some(id),
        Some(json!({ "code": shift.code })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// POST /api/schedules/entries
pub async fn upsert_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<UpsertEntry>,
) -> AppResult<Json<DataResponse<ScheduleEntry>>> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;
    input.validate()?;
    let codes = shift_infos(&shift_catalog(&state).await?);

    let mut tx = state.pool.begin().await?;
    let entry = upsert_in_tx(&mut tx, &input, &codes, auth.user_id).await?;
    tx.commit().await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::SCHEDULE_ENTRY,
        Some(entry.id),
        Some(json!({
            "user_id": entry.user_id,
            "work_date": entry.work_date,
            "shift_code": entry.shift_code,
            "period": entry.period,
        })),
    )
    .await;

    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/schedules/entries/bulk
///
/// All entries are written in one transaction; any failure rolls back the batch.
pub async fn bulk_upsert(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<BulkUpsertEntries>,
) -> AppResult<Json<DataResponse<Vec<ScheduleEntry>>>> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;
    input.validate()?;
    let codes = shift_infos(&shift_catalog(&state).await?);

    let mut tx = state.pool.begin().await?;
    let mut written = Vec::with_capacity(input.entries.len());
    for entry in &input.entries {
        written.push(upsert_in_tx(&mut tx, entry, &codes, auth.user_id).await?);
    }
    tx.commit().await?;

    tracing::info!(count = written.len(), user_id = auth.user_id, "Schedule entries written");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::SCHEDULE_ENTRY,
        None,
        Some(json!({ "bulk": written.len() })),
    )
    .await;

    Ok(Json(DataResponse { data: written }))
}

/// DELETE /api/schedules/entries/{id}
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, SCHEDULE_MANAGE).await?;
    if !ScheduleRepo::delete_entry(&state.pool, id).await? {
        return Err(AppError::not_found("ScheduleEntry", id));
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::SCHEDULE_ENTRY,
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/schedules/me?from&to
///
/// The caller's own entries; no permission needed. Defaults to the next 31 days.
pub async fn my_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<DataResponse<Vec<ScheduleEntry>>>> {
    let from = range.from.unwrap_or_else(|| Utc::now().date_naive());
    let to = range
        .to
        .unwrap_or_else(|| from + chrono::Duration::days(DEFAULT_ME_WINDOW_DAYS));
    validate_range(from, to)?;

    let entries = ScheduleRepo::entries_for_user(&state.pool, auth.user_id, from, to).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Grid and export
// ---------------------------------------------------------------------------

/// GET /api/schedules/grid?year&month&department&position
pub async fn month_grid(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GridQuery>,
) -> AppResult<Json<DataResponse<MonthGrid>>> {
    require_permission(&state, &auth, SCHEDULE_VIEW).await?;
    let grid = load_grid(&state, &query).await?;
    Ok(Json(DataResponse { data: grid }))
}

/// GET /api/schedules/export?year&month&format=csv|xlsx
///
/// One row per staff member, one column per day. Cells with several
/// periods join their codes with `/`.
pub async fn export_grid(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GridQuery>,
) -> AppResult<Response> {
    require_permission(&state, &auth, SCHEDULE_VIEW).await?;
    let format = ExportFormat::from_query(query.format.as_deref())?;
    let grid = load_grid(&state, &query).await?;

    let mut headers = vec![
        "staff".to_string(),
        "position".to_string(),
        "department".to_string(),
    ];
    headers.extend(grid.days.iter().map(|d| format!("{} {}", d.day, d.weekday)));
    headers.push("total_hours".into());
    headers.push("working_days".into());

    let mut table = Table::new(headers);
    for row in &grid.rows {
        let mut cells = vec![
            row.full_name.clone(),
            row.position.clone().unwrap_or_default(),
            row.department.clone().unwrap_or_default(),
        ];
        cells.extend(grid.days.iter().map(|d| {
            row.cells
                .get(&d.day)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| e.shift_code.as_str())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default()
        }));
        cells.push(format!("{:.1}", row.total_hours));
        cells.push(row.working_days.to_string());
        table.push(cells);
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::EXPORT,
        entities::SCHEDULE_ENTRY,
        None,
        Some(json!({ "year": grid.year, "month": grid.month, "format": format.as_str() })),
    )
    .await;

    export::respond(
        format,
        &format!("schedule-{:04}-{:02}", grid.year, grid.month),
        &table,
    )
}
