//! Quality management: incident lifecycle, complaints and rates.

use crate::error::CoreError;
use crate::finance::percentage;
use crate::handover::HandoverPriority;

define_text_enum! {
    IncidentSeverity("incident severity") {
        Low = "low",
        Medium = "medium",
        High = "high",
        Critical = "critical",
    }
}

define_text_enum! {
    IncidentStatus("incident status") {
        Reported = "reported",
        Investigating = "investigating",
        Resolved = "resolved",
        Closed = "closed",
    }
}

define_text_enum! {
    ComplaintChannel("complaint channel") {
        InPerson = "in_person",
        Phone = "phone",
        Email = "email",
        Online = "online",
    }
}

define_text_enum! {
    ComplaintStatus("complaint status") {
        Open = "open",
        InReview = "in_review",
        Resolved = "resolved",
    }
}

impl IncidentSeverity {
    /// High and critical incidents alert admins and managers.
    pub fn requires_escalation(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Priority of a handover task spawned from an incident.
    pub fn handover_priority(self) -> HandoverPriority {
        match self {
            Self::Low => HandoverPriority::Low,
            Self::Medium => HandoverPriority::Medium,
            Self::High => HandoverPriority::High,
            Self::Critical => HandoverPriority::Urgent,
        }
    }
}

impl IncidentStatus {
    pub fn valid_transitions(self) -> &'static [IncidentStatus] {
        match self {
            Self::Reported => &[Self::Investigating],
            Self::Investigating => &[Self::Resolved],
            Self::Resolved => &[Self::Closed, Self::Investigating],
            Self::Closed => &[],
        }
    }
}

/// Validate an incident status change. Resolving requires a corrective action.
pub fn validate_incident_transition(
    from: IncidentStatus,
    to: IncidentStatus,
    has_corrective_action: bool,
) -> Result<(), CoreError> {
    if !from.valid_transitions().contains(&to) {
        return Err(CoreError::transition("incident", from, to));
    }
    if to == IncidentStatus::Resolved && !has_corrective_action {
        return Err(CoreError::Validation(
            "A corrective action is required to resolve an incident".into(),
        ));
    }
    Ok(())
}

/// Title of a handover task spawned from an incident.
pub fn spawned_handover_title(incident_id: i64, incident_title: &str) -> String {
    format!("[Incident #{incident_id}] {incident_title}")
}

/// Share of incidents resolved or closed, as a percentage with two decimals.
pub fn resolution_rate(resolved_or_closed: i64, total: i64) -> f64 {
    percentage(resolved_or_closed, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_skip_investigation() {
        assert!(validate_incident_transition(
            IncidentStatus::Reported,
            IncidentStatus::Resolved,
            true
        )
        .is_err());
    }

    #[test]
    fn resolving_needs_corrective_action() {
        let err = validate_incident_transition(
            IncidentStatus::Investigating,
            IncidentStatus::Resolved,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("corrective action"));
        assert!(validate_incident_transition(
            IncidentStatus::Investigating,
            IncidentStatus::Resolved,
            true
        )
        .is_ok());
    }

    #[test]
    fn resolved_can_be_reopened_or_closed() {
        assert!(
            validate_incident_transition(IncidentStatus::Resolved, IncidentStatus::Closed, true)
                .is_ok()
        );
        assert!(validate_incident_transition(
            IncidentStatus::Resolved,
            IncidentStatus::Investigating,
            true
        )
        .is_ok());
        assert!(IncidentStatus::Closed.valid_transitions().is_empty());
    }

    #[test]
    fn severity_maps_to_handover_priority() {
        assert_eq!(IncidentSeverity::Critical.handover_priority(), HandoverPriority::Urgent);
        assert!(IncidentSeverity::High.requires_escalation());
        assert!(!IncidentSeverity::Medium.requires_escalation());
    }

    #[test]
    fn rate_handles_zero_total() {
        assert_eq!(resolution_rate(0, 0), 0.0);
        assert_eq!(resolution_rate(1, 3), 33.33);
    }

    #[test]
    fn spawned_title_prefix() {
        assert_eq!(spawned_handover_title(12, "Fall in ward B"), "[Incident #12] Fall in ward B");
    }
}
