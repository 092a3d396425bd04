//! Handlers for incident reports, patient complaints and quality stats.
//!
//! Anyone with `quality.view` can report an incident or log a complaint;
//! triage, status changes and resolution need `quality.manage`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{QUALITY_MANAGE, QUALITY_VIEW};
use clinicops_core::quality::{
    resolution_rate, spawned_handover_title, validate_incident_transition, ComplaintChannel,
    ComplaintStatus, IncidentSeverity, IncidentStatus,
};
use clinicops_core::roles::ALERT_ROLES;
use clinicops_core::types::DbId;
use clinicops_db::models::handover::Handover;
use clinicops_db::models::quality::{
    Complaint, ComplaintListParams, CountRow, CreateComplaint, CreateIncident, Incident,
    IncidentListParams, IncidentStatusChange, ResolveComplaint, StatsParams, UpdateComplaint,
    UpdateIncident,
};
use clinicops_db::repositories::{HandoverRepo, QualityRepo};
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

/// Aggregates for `GET /quality/stats`.
#[derive(Debug, Serialize)]
pub struct QualityStats {
    pub incidents_total: i64,
    pub incidents_by_severity: Vec<CountRow>,
    pub incidents_by_status: Vec<CountRow>,
    pub complaints_by_status: Vec<CountRow>,
    pub complaints_by_channel: Vec<CountRow>,
    /// Resolved or closed incidents as a percentage of all incidents.
    pub resolution_rate_pct: f64,
}

/// Incident plus the handover spawned from it.
#[derive(Debug, Serialize)]
pub struct SpawnedHandover {
    pub incident: Incident,
    pub handover: Handover,
}

async fn find_incident(state: &AppState, id: DbId) -> AppResult<Incident> {
    QualityRepo::find_incident(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Incident", id))
}

async fn find_complaint(state: &AppState, id: DbId) -> AppResult<Complaint> {
    QualityRepo::find_complaint(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint", id))
}

fn count_of(rows: &[CountRow], keys: &[&str]) -> i64 {
    rows.iter()
        .filter(|r| keys.contains(&r.key.as_str()))
        .map(|r| r.count)
        .sum()
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

/// GET /api/quality/incidents?page&limit&status&severity
pub async fn list_incidents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<IncidentListParams>,
) -> AppResult<Json<PaginatedResponse<Incident>>> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        IncidentStatus::parse(status)?;
    }
    if let Some(severity) = params.severity.as_deref() {
        IncidentSeverity::parse(severity)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = QualityRepo::list_incidents(&state.pool, &params, page).await?;
    let total = QualityRepo::count_incidents(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/quality/incidents
///
/// High and critical incidents alert admins and managers.
pub async fn create_incident(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateIncident>,
) -> AppResult<(StatusCode, Json<DataResponse<Incident>>)> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    input.validate()?;
    let severity = IncidentSeverity::parse(&input.severity)?;

    let mut tx = state.pool.begin().await?;
    let incident = QualityRepo::create_incident(&mut tx, &input, auth.user_id).await?;
    tx.commit().await?;

    tracing::info!(incident_id = incident.id, %severity, "Incident reported");
    if severity.requires_escalation() {
        state.publish(
            ClinicEvent::new(
                event_types::INCIDENT_REPORTED,
                format!("{severity} incident reported"),
                incident.title.clone(),
            )
            .with_source(entities::INCIDENT, incident.id)
            .with_actor(auth.user_id)
            .with_audience(Audience::roles(ALERT_ROLES)),
        );
    }
    if let Some(assignee) = incident.assigned_to_id {
        state.publish(
            ClinicEvent::new(
                event_types::INCIDENT_REPORTED,
                "Incident assigned to you",
                incident.title.clone(),
            )
            .with_source(entities::INCIDENT, incident.id)
            .with_actor(auth.user_id)
            .with_audience(Audience::User(assignee)),
        );
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::INCIDENT,
        Some(incident.id),
        Some(json!({ "title": incident.title, "severity": incident.severity })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: incident })))
}

/// GET /api/quality/incidents/{id}
pub async fn get_incident(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Incident>>> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    let incident = find_incident(&state, id).await?;
    Ok(Json(DataResponse { data: incident }))
}

/// PATCH /api/quality/incidents/{id}
pub async fn update_incident(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateIncident>,
) -> AppResult<Json<DataResponse<Incident>>> {
    require_permission(&state, &auth, QUALITY_MANAGE).await?;
    input.validate()?;
    if let Some(severity) = input.severity.as_deref() {
        IncidentSeverity::parse(severity)?;
    }

    let existing = find_incident(&state, id).await?;
    if IncidentStatus::parse(&existing.status)? == IncidentStatus::Closed {
        return Err(AppError::validation("Closed incidents cannot be edited"));
    }

    let incident = QualityRepo::update_incident(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Incident", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::INCIDENT,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: incident }))
}

/// POST /api/quality/incidents/{id}/status
///
/// Resolving requires a corrective action, either already recorded or
/// supplied with the request.
pub async fn change_incident_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<IncidentStatusChange>,
) -> AppResult<Json<DataResponse<Incident>>> {
    require_permission(&state, &auth, QUALITY_MANAGE).await?;
    let to = IncidentStatus::parse(&input.status)?;

    let existing = find_incident(&state, id).await?;
    let from = IncidentStatus::parse(&existing.status)?;
    let corrective_action = input
        .corrective_action
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let has_action = corrective_action.is_some()
        || existing
            .corrective_action
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
    validate_incident_transition(from, to, has_action)?;

    let incident = QualityRepo::set_incident_status(&state.pool, id, from, to, corrective_action)
        .await?
        .ok_or_else(|| AppError::conflict("Incident status changed concurrently"))?;

    tracing::info!(incident_id = id, %from, %to, "Incident status changed");
    audit::record(
        &state,
        Some(auth.user_id),
        actions::STATUS_CHANGE,
        entities::INCIDENT,
        Some(id),
        Some(json!({ "from": from.as_str(), "to": to.as_str() })),
    )
    .await;

    Ok(Json(DataResponse { data: incident }))
}

/// POST /api/quality/incidents/{id}/handover
///
/// Spawns a follow-up handover task for the incident and links it. An
/// incident can spawn at most one handover.
pub async fn spawn_handover(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<SpawnedHandover>>)> {
    require_permission(&state, &auth, QUALITY_MANAGE).await?;

    let existing = find_incident(&state, id).await?;
    if let Some(handover_id) = existing.handover_id {
        return Err(AppError::conflict(format!(
            "Incident already has handover {handover_id}"
        )));
    }
    let priority = IncidentSeverity::parse(&existing.severity)?.handover_priority();
    let title = spawned_handover_title(existing.id, &existing.title);

    let mut tx = state.pool.begin().await?;
    let handover = HandoverRepo::create_from_incident(
        &mut tx,
        &title,
        &existing.description,
        priority.as_str(),
        existing.assigned_to_id,
        auth.user_id,
        existing.id,
    )
    .await?;
    // A concurrent spawn may have linked the incident since it was read;
    // dropping the transaction discards the handover created above.
    let Some(incident) = QualityRepo::link_handover(&mut tx, id, handover.id).await? else {
        return Err(AppError::conflict(format!(
            "Incident {id} already has a handover"
        )));
    };
    tx.commit().await?;

    if let Some(assignee) = handover.assignee_id {
        state.publish(
            ClinicEvent::new(
                event_types::HANDOVER_ASSIGNED,
                "Handover assigned to you",
                format!("[{}] {}", handover.priority, handover.title),
            )
            .with_source(entities::HANDOVER, handover.id)
            .with_actor(auth.user_id)
            .with_audience(Audience::User(assignee)),
        );
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::HANDOVER,
        Some(handover.id),
        Some(json!({ "source_incident_id": id })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SpawnedHandover { incident, handover },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Complaints
// ---------------------------------------------------------------------------

/// GET /api/quality/complaints?page&limit&status
pub async fn list_complaints(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ComplaintListParams>,
) -> AppResult<Json<PaginatedResponse<Complaint>>> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        ComplaintStatus::parse(status)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = QualityRepo::list_complaints(&state.pool, &params, page).await?;
    let total = QualityRepo::count_complaints(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/quality/complaints
pub async fn create_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateComplaint>,
) -> AppResult<(StatusCode, Json<DataResponse<Complaint>>)> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    input.validate()?;
    ComplaintChannel::parse(&input.channel)?;

    let complaint = QualityRepo::create_complaint(&state.pool, &input).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::COMPLAINT,
        Some(complaint.id),
        Some(json!({ "channel": complaint.channel })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: complaint })))
}

/// GET /api/quality/complaints/{id}
pub async fn get_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Complaint>>> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    let complaint = find_complaint(&state, id).await?;
    Ok(Json(DataResponse { data: complaint }))
}

/// PATCH /api/quality/complaints/{id}
pub async fn update_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateComplaint>,
) -> AppResult<Json<DataResponse<Complaint>>> {
    require_permission(&state, &auth, QUALITY_MANAGE).await?;
    let existing = find_complaint(&state, id).await?;

    if let Some(status) = input.status.as_deref() {
        if ComplaintStatus::parse(status)? == ComplaintStatus::Resolved
            && input.response.is_none()
            && existing.response.is_none()
        {
            return Err(AppError::validation(
                "A response is required to resolve a complaint",
            ));
        }
    }

    let complaint = QualityRepo::update_complaint(&state.pool, id, &input, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Complaint", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::COMPLAINT,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: complaint }))
}

/// POST /api/quality/complaints/{id}/resolve
pub async fn resolve_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveComplaint>,
) -> AppResult<Json<DataResponse<Complaint>>> {
    require_permission(&state, &auth, QUALITY_MANAGE).await?;
    input.validate()?;
    find_complaint(&state, id).await?;

    let complaint = QualityRepo::resolve_complaint(&state.pool, id, &input.response, auth.user_id)
        .await?
        .ok_or_else(|| AppError::validation("Complaint is already resolved"))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::STATUS_CHANGE,
        entities::COMPLAINT,
        Some(id),
        Some(json!({ "to": ComplaintStatus::Resolved.as_str() })),
    )
    .await;

    Ok(Json(DataResponse { data: complaint }))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// GET /api/quality/stats?from&to
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<DataResponse<QualityStats>>> {
    require_permission(&state, &auth, QUALITY_VIEW).await?;
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if to < from {
            return Err(AppError::validation("`to` must not be before `from`"));
        }
    }

    let (from, to) = (params.from, params.to);
    let incidents_by_severity = QualityRepo::incidents_by_severity(&state.pool, from, to).await?;
    let incidents_by_status = QualityRepo::incidents_by_status(&state.pool, from, to).await?;
    let complaints_by_status = QualityRepo::complaints_by_status(&state.pool, from, to).await?;
    let complaints_by_channel = QualityRepo::complaints_by_channel(&state.pool, from, to).await?;

    let incidents_total: i64 = incidents_by_status.iter().map(|r| r.count).sum();
    let done = count_of(
        &incidents_by_status,
        &[IncidentStatus::Resolved.as_str(), IncidentStatus::Closed.as_str()],
    );

    Ok(Json(DataResponse {
        data: QualityStats {
            incidents_total,
            resolution_rate_pct: resolution_rate(done, incidents_total),
            incidents_by_severity,
            incidents_by_status,
            complaints_by_status,
            complaints_by_channel,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, count: i64) -> CountRow {
        CountRow {
            key: key.into(),
            count,
        }
    }

    #[test]
    fn count_of_sums_matching_keys() {
        let rows = vec![row("reported", 2), row("resolved", 3), row("closed", 1)];
        assert_eq!(count_of(&rows, &["resolved", "closed"]), 4);
        assert_eq!(count_of(&rows, &["investigating"]), 0);
    }
}
