//! Handlers for certifications, leave requests and staff skills.
//!
//! Staff can always read their own records and file their own leave.
//! Reading other people's records needs `hr.view`; every write on someone
//! else's behalf (and every review) needs `hr.manage`.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Utc};
use clinicops_core::audit::{actions, entities};
use clinicops_core::event_types;
use clinicops_core::hr::{
    certification_status, ensure_pending, leave_days, normalize_skill,
    validate_certification_dates, validate_skill_level, LeaveStatus, LeaveType,
    EXPIRY_WARNING_DAYS,
};
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{HR_MANAGE, HR_VIEW};
use clinicops_core::roles::ALERT_ROLES;
use clinicops_core::types::DbId;
use clinicops_db::models::hr::{
    Certification, CertificationListParams, CertificationView, CreateCertification,
    CreateLeaveRequest, CreateSkill, ExpiringParams, LeaveListParams, LeaveRequest,
    LeaveSummaryParams, LeaveSummaryRow, SkillListParams, SkillMatrixRow, UpdateCertification,
    UpdateSkill, UserSkill,
};
use clinicops_db::repositories::{HrRepo, UserRepo};
use clinicops_events::{Audience, ClinicEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{require_permission, Permissions};
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeaveReview {
    pub note: Option<String>,
}

/// Approved leave of one user in one year.
#[derive(Debug, Serialize)]
pub struct LeaveSummary {
    pub user_id: DbId,
    pub year: i32,
    pub by_type: Vec<LeaveSummaryRow>,
    pub total_days: i64,
}

/// Users holding one skill, strongest first.
#[derive(Debug, Serialize)]
pub struct SkillMatrixEntry {
    pub skill: String,
    pub users: Vec<SkillHolder>,
}

#[derive(Debug, Serialize)]
pub struct SkillHolder {
    pub user_id: DbId,
    pub full_name: String,
    pub level: i16,
    pub verified: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pass for the record owner; otherwise require `perm`.
async fn require_self_or(
    state: &AppState,
    auth: &AuthUser,
    owner_id: DbId,
    perm: &str,
) -> AppResult<()> {
    if owner_id != auth.user_id {
        require_permission(state, auth, perm).await?;
    }
    Ok(())
}

fn with_status(certification: Certification) -> CertificationView {
    let today = Utc::now().date_naive();
    let expiry_status =
        certification_status(certification.expires_on, today, EXPIRY_WARNING_DAYS);
    CertificationView {
        certification,
        expiry_status,
    }
}

async fn ensure_user_exists(state: &AppState, user_id: DbId) -> AppResult<()> {
    if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
        return Err(AppError::not_found("User", user_id));
    }
    Ok(())
}

async fn find_leave(state: &AppState, id: DbId) -> AppResult<LeaveRequest> {
    HrRepo::find_leave(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("LeaveRequest", id))
}

fn group_matrix(rows: Vec<SkillMatrixRow>) -> Vec<SkillMatrixEntry> {
    let mut by_skill: BTreeMap<String, Vec<SkillHolder>> = BTreeMap::new();
    for row in rows {
        by_skill.entry(row.skill).or_default().push(SkillHolder {
            user_id: row.user_id,
            full_name: row.full_name,
            level: row.level,
            verified: row.verified,
        });
    }
    by_skill
        .into_iter()
        .map(|(skill, mut users)| {
            users.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.full_name.cmp(&b.full_name)));
            SkillMatrixEntry { skill, users }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Certifications
// ---------------------------------------------------------------------------

/// GET /api/hr/certifications?user_id
///
/// Without `user_id` this lists everyone and needs `hr.view`.
pub async fn list_certifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<CertificationListParams>,
) -> AppResult<Json<DataResponse<Vec<CertificationView>>>> {
    match params.user_id {
        Some(user_id) => require_self_or(&state, &auth, user_id, HR_VIEW).await?,
        None => {
            require_permission(&state, &auth, HR_VIEW).await?;
        }
    }
    let rows = HrRepo::list_certifications(&state.pool, params.user_id).await?;
    Ok(Json(DataResponse {
        data: rows.into_iter().map(with_status).collect(),
    }))
}

/// GET /api/hr/certifications/expiring?days
pub async fn expiring_certifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ExpiringParams>,
) -> AppResult<Json<DataResponse<Vec<CertificationView>>>> {
    require_permission(&state, &auth, HR_VIEW).await?;
    let days = params.days.unwrap_or(EXPIRY_WARNING_DAYS);
    if !(0..=365).contains(&days) {
        return Err(AppError::validation("days must be between 0 and 365"));
    }
    let cutoff = Utc::now().date_naive() + chrono::Duration::days(days);
    let rows = HrRepo::certifications_expiring_before(&state.pool, cutoff).await?;
    Ok(Json(DataResponse {
        data: rows.into_iter().map(with_status).collect(),
    }))
}

/// POST /api/hr/certifications
pub async fn create_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCertification>,
) -> AppResult<(StatusCode, Json<DataResponse<CertificationView>>)> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    input.validate()?;
    validate_certification_dates(input.issued_on, input.expires_on)?;
    ensure_user_exists(&state, input.user_id).await?;

    let certification = HrRepo::create_certification(&state.pool, &input).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::CERTIFICATION,
        Some(certification.id),
        Some(json!({ "user_id": certification.user_id, "name": certification.name })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: with_status(certification),
        }),
    ))
}

/// GET /api/hr/certifications/{id}
pub async fn get_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CertificationView>>> {
    let certification = HrRepo::find_certification(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Certification", id))?;
    require_self_or(&state, &auth, certification.user_id, HR_VIEW).await?;
    Ok(Json(DataResponse {
        data: with_status(certification),
    }))
}

/// PATCH /api/hr/certifications/{id}
pub async fn update_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCertification>,
) -> AppResult<Json<DataResponse<CertificationView>>> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    input.validate()?;

    let existing = HrRepo::find_certification(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Certification", id))?;
    validate_certification_dates(
        input.issued_on.or(existing.issued_on),
        input.expires_on.or(existing.expires_on),
    )?;

    let certification = HrRepo::update_certification(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Certification", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::CERTIFICATION,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse {
        data: with_status(certification),
    }))
}

/// DELETE /api/hr/certifications/{id}
pub async fn delete_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    if !HrRepo::delete_certification(&state.pool, id).await? {
        return Err(AppError::not_found("Certification", id));
    }
    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::CERTIFICATION,
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Leave
// ---------------------------------------------------------------------------

/// GET /api/hr/leave?page&limit&status&user_id&mine
///
/// Callers without `hr.view` only ever see their own requests.
pub async fn list_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<LeaveListParams>,
) -> AppResult<Json<PaginatedResponse<LeaveRequest>>> {
    if let Some(status) = params.status.as_deref() {
        LeaveStatus::parse(status)?;
    }
    let perms = Permissions::load(&state.pool, &auth).await?;
    let scope = if params.mine || !perms.has(HR_VIEW) {
        Some(auth.user_id)
    } else {
        params.user_id
    };

    let page = Page::new(params.page, params.limit);
    let rows = HrRepo::list_leave(&state.pool, &params, scope, page).await?;
    let total = HrRepo::count_leave(&state.pool, &params, scope).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/hr/leave
///
/// Files leave for the caller. Overlapping pending or approved leave is a conflict.
pub async fn create_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateLeaveRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<LeaveRequest>>)> {
    input.validate()?;
    LeaveType::parse(&input.leave_type)?;
    let days = leave_days(input.start_date, input.end_date)?;

    if HrRepo::has_overlapping_leave(&state.pool, auth.user_id, input.start_date, input.end_date)
        .await?
    {
        return Err(AppError::conflict(
            "Leave overlaps an existing pending or approved request",
        ));
    }

    let leave = HrRepo::create_leave(&state.pool, auth.user_id, &input, days).await?;

    tracing::info!(leave_id = leave.id, user_id = auth.user_id, days, "Leave requested");
    state.publish(
        ClinicEvent::new(
            event_types::LEAVE_SUBMITTED,
            "Leave request submitted",
            format!(
                "{} leave {} to {} ({} day(s))",
                leave.leave_type, leave.start_date, leave.end_date, leave.days
            ),
        )
        .with_source(entities::LEAVE_REQUEST, leave.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::roles(ALERT_ROLES)),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::LEAVE_REQUEST,
        Some(leave.id),
        Some(json!({
            "leave_type": leave.leave_type,
            "start_date": leave.start_date,
            "end_date": leave.end_date,
        })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: leave })))
}

/// GET /api/hr/leave/{id}
pub async fn get_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    let leave = find_leave(&state, id).await?;
    require_self_or(&state, &auth, leave.user_id, HR_VIEW).await?;
    Ok(Json(DataResponse { data: leave }))
}

/// POST /api/hr/leave/{id}/approve
pub async fn approve_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<LeaveReview>>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    review_leave(state, auth, id, LeaveStatus::Approved, body).await
}

/// POST /api/hr/leave/{id}/reject
pub async fn reject_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<LeaveReview>>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    review_leave(state, auth, id, LeaveStatus::Rejected, body).await
}

async fn review_leave(
    state: AppState,
    auth: AuthUser,
    id: DbId,
    decision: LeaveStatus,
    body: Option<Json<LeaveReview>>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    let note = body.and_then(|Json(b)| b.note);

    let existing = find_leave(&state, id).await?;
    if existing.user_id == auth.user_id {
        return Err(AppError::forbidden("You cannot review your own leave request"));
    }
    ensure_pending(LeaveStatus::parse(&existing.status)?, "reviewed")?;

    let leave = HrRepo::close_leave(&state.pool, id, decision, Some(auth.user_id), note.as_deref())
        .await?
        .ok_or_else(|| AppError::conflict("Leave request was updated concurrently"))?;

    state.publish(
        ClinicEvent::new(
            event_types::LEAVE_REVIEWED,
            format!("Leave {decision}"),
            format!(
                "Your {} leave from {} to {} was {decision}",
                leave.leave_type, leave.start_date, leave.end_date
            ),
        )
        .with_source(entities::LEAVE_REQUEST, leave.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::User(leave.user_id)),
    );
    let action = match decision {
        LeaveStatus::Approved => actions::APPROVE,
        _ => actions::REJECT,
    };
    audit::record(
        &state,
        Some(auth.user_id),
        action,
        entities::LEAVE_REQUEST,
        Some(id),
        Some(json!({ "user_id": leave.user_id, "note": leave.review_note })),
    )
    .await;

    Ok(Json(DataResponse { data: leave }))
}

/// POST /api/hr/leave/{id}/cancel
///
/// Owner only, while still pending.
pub async fn cancel_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LeaveRequest>>> {
    let existing = find_leave(&state, id).await?;
    if existing.user_id != auth.user_id {
        return Err(AppError::forbidden("Only the requester can cancel leave"));
    }
    ensure_pending(LeaveStatus::parse(&existing.status)?, "cancelled")?;

    let leave = HrRepo::close_leave(&state.pool, id, LeaveStatus::Cancelled, None, None)
        .await?
        .ok_or_else(|| AppError::conflict("Leave request was updated concurrently"))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CANCEL,
        entities::LEAVE_REQUEST,
        Some(id),
        None,
    )
    .await;

    Ok(Json(DataResponse { data: leave }))
}

/// GET /api/hr/leave/summary?user_id&year
pub async fn leave_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<LeaveSummaryParams>,
) -> AppResult<Json<DataResponse<LeaveSummary>>> {
    let user_id = params.user_id.unwrap_or(auth.user_id);
    require_self_or(&state, &auth, user_id, HR_VIEW).await?;
    let year = params.year.unwrap_or_else(|| Utc::now().year());

    let by_type = HrRepo::leave_summary(&state.pool, user_id, year).await?;
    let total_days = by_type.iter().map(|r| r.days).sum();
    Ok(Json(DataResponse {
        data: LeaveSummary {
            user_id,
            year,
            by_type,
            total_days,
        },
    }))
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// GET /api/hr/skills?user_id&skill
pub async fn list_skills(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(mut params): Query<SkillListParams>,
) -> AppResult<Json<DataResponse<Vec<UserSkill>>>> {
    match params.user_id {
        Some(user_id) => require_self_or(&state, &auth, user_id, HR_VIEW).await?,
        None => {
            require_permission(&state, &auth, HR_VIEW).await?;
        }
    }
    params.skill = params.skill.as_deref().map(normalize_skill);
    let rows = HrRepo::list_skills(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/hr/skills/matrix
pub async fn skill_matrix(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SkillMatrixEntry>>>> {
    require_permission(&state, &auth, HR_VIEW).await?;
    let rows = HrRepo::skill_matrix(&state.pool).await?;
    Ok(Json(DataResponse {
        data: group_matrix(rows),
    }))
}

/// POST /api/hr/skills
pub async fn create_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateSkill>,
) -> AppResult<(StatusCode, Json<DataResponse<UserSkill>>)> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    input.validate()?;
    validate_skill_level(input.level)?;
    ensure_user_exists(&state, input.user_id).await?;

    let skill = normalize_skill(&input.skill);
    let row = HrRepo::create_skill(&state.pool, &input, &skill).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::SKILL,
        Some(row.id),
        Some(json!({ "user_id": row.user_id, "skill": row.skill, "level": row.level })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// PATCH /api/hr/skills/{id}
pub async fn update_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSkill>,
) -> AppResult<Json<DataResponse<UserSkill>>> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    if let Some(level) = input.level {
        validate_skill_level(level)?;
    }
    let verifier = input.verify.then_some(auth.user_id);

    let row = HrRepo::update_skill(&state.pool, id, input.level, verifier)
        .await?
        .ok_or_else(|| AppError::not_found("Skill", id))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::SKILL,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: row }))
}

/// DELETE /api/hr/skills/{id}
pub async fn delete_skill(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, HR_MANAGE).await?;
    if !HrRepo::delete_skill(&state.pool, id).await? {
        return Err(AppError::not_found("Skill", id));
    }
    audit::record(&state, Some(auth.user_id), actions::DELETE, entities::SKILL, Some(id), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(skill: &str, user_id: DbId, name: &str, level: i16) -> SkillMatrixRow {
        SkillMatrixRow {
            skill: skill.into(),
            user_id,
            full_name: name.into(),
            level,
            verified: false,
        }
    }

    #[test]
    fn matrix_groups_by_skill_strongest_first() {
        let matrix = group_matrix(vec![
            cell("iv insertion", 1, "Ana", 2),
            cell("triage", 1, "Ana", 3),
            cell("iv insertion", 2, "Ben", 5),
            cell("iv insertion", 3, "Cal", 2),
        ]);

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].skill, "iv insertion");
        let names: Vec<&str> = matrix[0].users.iter().map(|u| u.full_name.as_str()).collect();
        assert_eq!(names, ["Ben", "Ana", "Cal"]);
        assert_eq!(matrix[1].users.len(), 1);
    }
}
