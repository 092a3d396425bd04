//! Document/SOP and announcement models.

use clinicops_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub code: String,
    pub title: String,
    pub category: Option<String>,
    pub content: String,
    pub version: i32,
    pub status: String,
    pub author_id: Option<DbId>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDocument {
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateDocument {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// A row from the `document_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentVersion {
    pub id: DbId,
    pub document_id: DbId,
    pub version: i32,
    pub title: String,
    pub content: String,
    pub published_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A row from the `document_acknowledgements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentAcknowledgement {
    pub id: DbId,
    pub document_id: DbId,
    pub user_id: DbId,
    pub version: i32,
    pub created_at: Timestamp,
}

/// Acknowledgement joined with the acknowledging user's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AcknowledgementEntry {
    pub user_id: DbId,
    pub full_name: String,
    pub version: i32,
    pub created_at: Timestamp,
}

/// A row from the `announcements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Announcement {
    pub id: DbId,
    pub title: String,
    pub body: String,
    pub priority: String,
    pub author_id: Option<DbId>,
    pub published_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnnouncement {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
    pub priority: Option<String>,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_expired: bool,
}
