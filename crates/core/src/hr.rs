//! HR rules: leave lifecycle, certification expiry and skill levels.

use serde::Serialize;

use crate::dates::validate_range;
use crate::error::CoreError;
use crate::types::Date;

define_text_enum! {
    LeaveType("leave type") {
        Annual = "annual",
        Sick = "sick",
        Personal = "personal",
        Maternity = "maternity",
        Unpaid = "unpaid",
    }
}

define_text_enum! {
    LeaveStatus("leave status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
        Cancelled = "cancelled",
    }
}

/// Statuses that block a new overlapping request for the same user.
pub const BLOCKING_LEAVE_STATUSES: &[&str] = &["pending", "approved"];

/// Inclusive number of calendar days covered by a leave request.
pub fn leave_days(start: Date, end: Date) -> Result<i32, CoreError> {
    validate_range(start, end)?;
    Ok((end - start).num_days() as i32 + 1)
}

impl LeaveStatus {
    /// Only pending requests can be approved, rejected or cancelled.
    pub fn is_open(self) -> bool {
        self == Self::Pending
    }
}

/// Guard for approve/reject/cancel.
pub fn ensure_pending(status: LeaveStatus, action: &str) -> Result<(), CoreError> {
    if status.is_open() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Only pending leave can be {action}; this request is {status}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Certifications
// ---------------------------------------------------------------------------

/// Days before expiry at which a certification is reported as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Derived certification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    Valid,
    Expiring,
    Expired,
    NoExpiry,
}

/// Classify a certification relative to `today`. A certification expiring
/// today is still valid for today and reported as expiring.
pub fn certification_status(
    expires_on: Option<Date>,
    today: Date,
    warning_days: i64,
) -> CertificationStatus {
    match expires_on {
        None => CertificationStatus::NoExpiry,
        Some(exp) if exp < today => CertificationStatus::Expired,
        Some(exp) if (exp - today).num_days() <= warning_days => CertificationStatus::Expiring,
        Some(_) => CertificationStatus::Valid,
    }
}

/// Validate that the issue date does not come after the expiry date.
pub fn validate_certification_dates(
    issued_on: Option<Date>,
    expires_on: Option<Date>,
) -> Result<(), CoreError> {
    if let (Some(i), Some(e)) = (issued_on, expires_on) {
        if e < i {
            return Err(CoreError::Validation(
                "Certification expires before it was issued".into(),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

pub const MIN_SKILL_LEVEL: i16 = 1;
pub const MAX_SKILL_LEVEL: i16 = 5;

pub fn validate_skill_level(level: i16) -> Result<(), CoreError> {
    if (MIN_SKILL_LEVEL..=MAX_SKILL_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Skill level must be between {MIN_SKILL_LEVEL} and {MAX_SKILL_LEVEL}"
        )))
    }
}

/// Normalize a skill name for uniqueness (trimmed, lowercase).
pub fn normalize_skill(name: &str) -> String {
    name.trim().to_lowercase()
}
