//! Shift handover tasks: priorities, shifts and the status lifecycle.

use crate::error::CoreError;

define_text_enum! {
    /// Handover urgency.
    HandoverPriority("handover priority") {
        Low = "low",
        Medium = "medium",
        High = "high",
        Urgent = "urgent",
    }
}

define_text_enum! {
    /// Handover lifecycle status.
    HandoverStatus("handover status") {
        Open = "open",
        InProgress = "in_progress",
        Done = "done",
        Cancelled = "cancelled",
    }
}

define_text_enum! {
    /// The shift a handover was raised on.
    ShiftSlot("shift") {
        Morning = "morning",
        Afternoon = "afternoon",
        Night = "night",
    }
}

/// Maximum title length.
pub const MAX_TITLE_LEN: usize = 200;

impl HandoverStatus {
    /// Statuses reachable from `self`. `done` and `cancelled` are terminal.
    pub fn valid_transitions(self) -> &'static [HandoverStatus] {
        match self {
            Self::Open => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Open, Self::Done, Self::Cancelled],
            Self::Done | Self::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: HandoverStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Validate a status change, returning a validation error for illegal moves.
pub fn validate_transition(from: HandoverStatus, to: HandoverStatus) -> Result<(), CoreError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(CoreError::transition("handover", from, to))
    }
}

/// Validate a handover title.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title exceeds maximum length of {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}
