//! Handlers for SOP documents and announcements.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinicops_core::audit::{actions, entities};
use clinicops_core::documents::{
    ensure_allowed, validate_code, AnnouncementPriority, DocumentAction, DocumentStatus,
};
use clinicops_core::event_types;
use clinicops_core::pagination::Page;
use clinicops_core::permissions::{DOCUMENT_PUBLISH, DOCUMENT_VIEW};
use clinicops_core::types::DbId;
use clinicops_db::models::document::{
    AcknowledgementEntry, Announcement, AnnouncementListParams, CreateAnnouncement,
    CreateDocument, Document, DocumentAcknowledgement, DocumentListParams, DocumentVersion,
    UpdateDocument,
};
use clinicops_db::repositories::DocumentRepo;
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

/// Who has and has not read the current version of a document.
#[derive(Debug, Serialize)]
pub struct AcknowledgementReport {
    pub document_id: DbId,
    pub version: i32,
    pub acknowledged: Vec<AcknowledgementEntry>,
    pub pending_user_ids: Vec<DbId>,
}

async fn find_document(state: &AppState, id: DbId) -> AppResult<(Document, DocumentStatus)> {
    let doc = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;
    let status = DocumentStatus::parse(&doc.status)?;
    Ok((doc, status))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// GET /api/documents?page&limit&status&category&search
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<DocumentListParams>,
) -> AppResult<Json<PaginatedResponse<Document>>> {
    require_permission(&state, &auth, DOCUMENT_VIEW).await?;
    if let Some(status) = params.status.as_deref() {
        DocumentStatus::parse(status)?;
    }
    let page = Page::new(params.page, params.limit);
    let rows = DocumentRepo::list(&state.pool, &params, page).await?;
    let total = DocumentRepo::count(&state.pool, &params).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/documents
pub async fn create_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateDocument>,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    input.validate()?;
    validate_code(&input.code)?;

    let doc = DocumentRepo::create(&state.pool, &input, auth.user_id).await?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::CREATE,
        entities::DOCUMENT,
        Some(doc.id),
        Some(json!({ "code": doc.code, "title": doc.title })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: doc })))
}

/// GET /api/documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    require_permission(&state, &auth, DOCUMENT_VIEW).await?;
    let (doc, _) = find_document(&state, id).await?;
    Ok(Json(DataResponse { data: doc }))
}

/// PATCH /api/documents/{id}
pub async fn update_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDocument>,
) -> AppResult<Json<DataResponse<Document>>> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    input.validate()?;
    let (_, status) = find_document(&state, id).await?;
    ensure_allowed(status, DocumentAction::Edit)?;

    let doc = DocumentRepo::update_draft(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::conflict("Document is no longer a draft"))?;

    audit::record(
        &state,
        Some(auth.user_id),
        actions::UPDATE,
        entities::DOCUMENT,
        Some(id),
        serde_json::to_value(&input).ok(),
    )
    .await;

    Ok(Json(DataResponse { data: doc }))
}

/// DELETE /api/documents/{id}
///
/// Only drafts can be deleted; published documents are archived instead.
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    let (_, status) = find_document(&state, id).await?;
    ensure_allowed(status, DocumentAction::Delete)?;

    if !DocumentRepo::delete_draft(&state.pool, id).await? {
        return Err(AppError::conflict("Document is no longer a draft"));
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::DOCUMENT,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/documents/{id}/publish
///
/// Bumps the version, snapshots it and asks every active user to read it.
pub async fn publish_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    let (_, status) = find_document(&state, id).await?;
    ensure_allowed(status, DocumentAction::Publish)?;

    let (doc, version) = DocumentRepo::publish(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::conflict("Document is no longer a draft"))?;

    tracing::info!(document_id = id, version = version.version, "Document published");
    state.publish(
        ClinicEvent::new(
            event_types::DOCUMENT_PUBLISHED,
            format!("{} v{} published", doc.code, doc.version),
            format!("Please read and acknowledge \"{}\"", doc.title),
        )
        .with_source(entities::DOCUMENT, doc.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::AllActive)
        .with_payload(json!({ "version": doc.version })),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::PUBLISH,
        entities::DOCUMENT,
        Some(id),
        Some(json!({ "version": doc.version })),
    )
    .await;

    Ok(Json(DataResponse { data: doc }))
}

/// Guarded status move shared by revise and archive.
async fn move_document(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
    action: DocumentAction,
    to: DocumentStatus,
) -> AppResult<Document> {
    require_permission(state, auth, DOCUMENT_PUBLISH).await?;
    let (_, from) = find_document(state, id).await?;
    ensure_allowed(from, action)?;

    let doc = DocumentRepo::set_status(&state.pool, id, from, to)
        .await?
        .ok_or_else(|| AppError::conflict("Document status changed concurrently"))?;

    audit::record(
        state,
        Some(auth.user_id),
        actions::STATUS_CHANGE,
        entities::DOCUMENT,
        Some(id),
        Some(json!({ "from": from.as_str(), "to": to.as_str() })),
    )
    .await;

    Ok(doc)
}

/// POST /api/documents/{id}/revise
///
/// Reopens a published document as a draft; the next publish bumps the
/// version.
pub async fn revise_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    let doc = move_document(
        &state,
        &auth,
        id,
        DocumentAction::Revise,
        DocumentStatus::Draft,
    )
    .await?;
    Ok(Json(DataResponse { data: doc }))
}

/// POST /api/documents/{id}/archive
pub async fn archive_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    let doc = move_document(
        &state,
        &auth,
        id,
        DocumentAction::Archive,
        DocumentStatus::Archived,
    )
    .await?;
    Ok(Json(DataResponse { data: doc }))
}

/// GET /api/documents/{id}/versions
pub async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<DocumentVersion>>>> {
    require_permission(&state, &auth, DOCUMENT_VIEW).await?;
    find_document(&state, id).await?;
    let versions = DocumentRepo::versions(&state.pool, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/documents/{id}/acknowledge
///
/// Acknowledges the current published version. Acknowledging the same
/// version twice is a conflict.
pub async fn acknowledge_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<DocumentAcknowledgement>>)> {
    require_permission(&state, &auth, DOCUMENT_VIEW).await?;
    let (doc, status) = find_document(&state, id).await?;
    ensure_allowed(status, DocumentAction::Acknowledge)?;

    let ack = DocumentRepo::acknowledge(&state.pool, id, auth.user_id, doc.version).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: ack })))
}

/// GET /api/documents/{id}/acknowledgements
pub async fn list_acknowledgements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AcknowledgementReport>>> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    let (doc, _) = find_document(&state, id).await?;

    let acknowledged = DocumentRepo::acknowledgements(&state.pool, id, doc.version).await?;
    let pending_user_ids = DocumentRepo::pending_acknowledgers(&state.pool, id, doc.version).await?;

    Ok(Json(DataResponse {
        data: AcknowledgementReport {
            document_id: id,
            version: doc.version,
            acknowledged,
            pending_user_ids,
        },
    }))
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

/// GET /api/announcements?page&limit&include_expired
pub async fn list_announcements(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<AnnouncementListParams>,
) -> AppResult<Json<PaginatedResponse<Announcement>>> {
    let page = Page::new(params.page, params.limit);
    let now = Utc::now();
    let rows =
        DocumentRepo::list_announcements(&state.pool, params.include_expired, now, page).await?;
    let total = DocumentRepo::count_announcements(&state.pool, params.include_expired, now).await?;
    Ok(Json(PaginatedResponse::new(rows, page, total)))
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateAnnouncement>,
) -> AppResult<(StatusCode, Json<DataResponse<Announcement>>)> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    input.validate()?;
    let priority = match input.priority.as_deref() {
        Some(p) => AnnouncementPriority::parse(p)?,
        None => AnnouncementPriority::Normal,
    };
    if input.expires_at.is_some_and(|at| at <= Utc::now()) {
        return Err(AppError::validation("expires_at must be in the future"));
    }

    let announcement = DocumentRepo::create_announcement(&state.pool, &input, auth.user_id).await?;

    let title = match priority {
        AnnouncementPriority::Normal => announcement.title.clone(),
        _ => format!("[{priority}] {}", announcement.title),
    };
    state.publish(
        ClinicEvent::new(
            event_types::ANNOUNCEMENT_PUBLISHED,
            title,
            announcement.body.clone(),
        )
        .with_source(entities::ANNOUNCEMENT, announcement.id)
        .with_actor(auth.user_id)
        .with_audience(Audience::AllActive),
    );
    audit::record(
        &state,
        Some(auth.user_id),
        actions::PUBLISH,
        entities::ANNOUNCEMENT,
        Some(announcement.id),
        Some(json!({ "priority": priority.as_str() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: announcement })))
}

/// DELETE /api/announcements/{id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_permission(&state, &auth, DOCUMENT_PUBLISH).await?;
    if !DocumentRepo::delete_announcement(&state.pool, id).await? {
        return Err(AppError::not_found("Announcement", id));
    }

    audit::record(
        &state,
        Some(auth.user_id),
        actions::DELETE,
        entities::ANNOUNCEMENT,
        Some(id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
