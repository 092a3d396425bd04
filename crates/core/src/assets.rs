//! Asset status, maintenance intervals and fault escalation.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Date;

define_text_enum! {
    AssetStatus("asset status") {
        Active = "active",
        UnderMaintenance = "under_maintenance",
        OutOfService = "out_of_service",
        Retired = "retired",
    }
}

define_text_enum! {
    FaultSeverity("fault severity") {
        Low = "low",
        Medium = "medium",
        High = "high",
        Critical = "critical",
    }
}

define_text_enum! {
    FaultStatus("fault status") {
        Open = "open",
        InProgress = "in_progress",
        Resolved = "resolved",
    }
}

/// Days ahead that count as "due soon" for maintenance reminders and the
/// dashboard.
pub const MAINTENANCE_DUE_WINDOW_DAYS: i64 = 7;

/// Next due date after completing maintenance on `performed_on`.
pub fn next_due(performed_on: Date, interval_days: i32) -> Result<Date, CoreError> {
    validate_interval(interval_days)?;
    performed_on
        .checked_add_signed(Duration::days(i64::from(interval_days)))
        .ok_or_else(|| CoreError::Validation("Next due date out of range".into()))
}

pub fn validate_interval(interval_days: i32) -> Result<(), CoreError> {
    if interval_days <= 0 {
        return Err(CoreError::Validation(
            "Maintenance interval must be at least one day".into(),
        ));
    }
    Ok(())
}

/// Asset status to apply when a fault of `severity` is reported, if any.
pub fn status_after_fault(current: AssetStatus, severity: FaultSeverity) -> Option<AssetStatus> {
    match (current, severity) {
        (AssetStatus::Retired, _) => None,
        (AssetStatus::OutOfService, _) => None,
        (_, FaultSeverity::Critical) => Some(AssetStatus::OutOfService),
        (AssetStatus::Active, FaultSeverity::High) => Some(AssetStatus::UnderMaintenance),
        _ => None,
    }
}

/// Asset status to apply once a fault is resolved and `remaining_open`
/// faults are still open on the asset.
pub fn status_after_resolution(current: AssetStatus, remaining_open: i64) -> Option<AssetStatus> {
    match current {
        AssetStatus::UnderMaintenance | AssetStatus::OutOfService if remaining_open == 0 => {
            Some(AssetStatus::Active)
        }
        _ => None,
    }
}

impl FaultStatus {
    pub fn can_transition(self, to: FaultStatus) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::InProgress)
                | (Self::Open, Self::Resolved)
                | (Self::InProgress, Self::Resolved)
                | (Self::InProgress, Self::Open)
        )
    }
}

pub fn validate_fault_transition(from: FaultStatus, to: FaultStatus) -> Result<(), CoreError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(CoreError::transition("fault report", from, to))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn next_due_adds_interval() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        assert_eq!(
            next_due(d, 30).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert!(next_due(d, 0).is_err());
    }

    #[test]
    fn critical_fault_takes_asset_out_of_service() {
        assert_eq!(
            status_after_fault(AssetStatus::Active, FaultSeverity::Critical),
            Some(AssetStatus::OutOfService)
        );
        assert_eq!(
            status_after_fault(AssetStatus::UnderMaintenance, FaultSeverity::Critical),
            Some(AssetStatus::OutOfService)
        );
    }

    #[test]
    fn high_fault_puts_active_asset_under_maintenance() {
        assert_eq!(
            status_after_fault(AssetStatus::Active, FaultSeverity::High),
            Some(AssetStatus::UnderMaintenance)
        );
        assert_eq!(status_after_fault(AssetStatus::Active, FaultSeverity::Low), None);
    }

    #[test]
    fn resolving_last_fault_reactivates() {
        assert_eq!(
            status_after_resolution(AssetStatus::OutOfService, 0),
            Some(AssetStatus::Active)
        );
        assert_eq!(status_after_resolution(AssetStatus::OutOfService, 1), None);
        assert_eq!(status_after_resolution(AssetStatus::Retired, 0), None);
    }

    #[test]
    fn resolved_fault_is_final() {
        assert!(validate_fault_transition(FaultStatus::Resolved, FaultStatus::Open).is_err());
        assert!(validate_fault_transition(FaultStatus::Open, FaultStatus::Resolved).is_ok());
    }
}
