//! HR models: certifications, leave requests and skills.

use clinicops_core::hr::CertificationStatus;
use clinicops_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Certifications
// ---------------------------------------------------------------------------

/// A row from the `certifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certification {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub issuer: Option<String>,
    pub license_number: Option<String>,
    pub issued_on: Option<Date>,
    pub expires_on: Option<Date>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Certification with its derived expiry status.
#[derive(Debug, Clone, Serialize)]
pub struct CertificationView {
    #[serde(flatten)]
    pub certification: Certification,
    pub expiry_status: CertificationStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCertification {
    pub user_id: DbId,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub issuer: Option<String>,
    pub license_number: Option<String>,
    pub issued_on: Option<Date>,
    pub expires_on: Option<Date>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCertification {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub license_number: Option<String>,
    pub issued_on: Option<Date>,
    pub expires_on: Option<Date>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificationListParams {
    pub user_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiringParams {
    pub days: Option<i64>,
}

// ---------------------------------------------------------------------------
// Leave
// ---------------------------------------------------------------------------

/// A row from the `leave_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaveRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub leave_type: String,
    pub start_date: Date,
    pub end_date: Date,
    pub days: i32,
    pub reason: Option<String>,
    pub status: String,
    pub reviewed_by_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeaveRequest {
    pub leave_type: String,
    pub start_date: Date,
    pub end_date: Date,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub user_id: Option<DbId>,
    #[serde(default)]
    pub mine: bool,
}

/// Approved days per leave type, for the summary endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaveSummaryRow {
    pub leave_type: String,
    pub requests: i64,
    pub days: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveSummaryParams {
    pub user_id: Option<DbId>,
    pub year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// A row from the `user_skills` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSkill {
    pub id: DbId,
    pub user_id: DbId,
    pub skill: String,
    pub level: i16,
    pub verified_by_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSkill {
    pub user_id: DbId,
    #[validate(length(min = 1, max = 100))]
    pub skill: String,
    pub level: i16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSkill {
    pub level: Option<i16>,
    /// Mark the skill as verified by the caller.
    #[serde(default)]
    pub verify: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillListParams {
    pub user_id: Option<DbId>,
    pub skill: Option<String>,
}

/// One (skill, user) cell of the skill matrix.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SkillMatrixRow {
    pub skill: String,
    pub user_id: DbId,
    pub full_name: String,
    pub level: i16,
    pub verified: bool,
}

/// Certification due for an expiry reminder.
#[derive(Debug, Clone, FromRow)]
pub struct ExpiringCertification {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub expires_on: Date,
}
