//! Document/SOP publishing lifecycle and announcement priorities.

use crate::error::CoreError;

define_text_enum! {
    DocumentStatus("document status") {
        Draft = "draft",
        Published = "published",
        Archived = "archived",
    }
}

define_text_enum! {
    AnnouncementPriority("announcement priority") {
        Normal = "normal",
        Important = "important",
        Urgent = "urgent",
    }
}

/// Document actions gated by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    Edit,
    Publish,
    Revise,
    Archive,
    Delete,
    Acknowledge,
}

impl DocumentAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Edit => "edited",
            Self::Publish => "published",
            Self::Revise => "revised",
            Self::Archive => "archived",
            Self::Delete => "deleted",
            Self::Acknowledge => "acknowledged",
        }
    }
}

/// Whether `action` is allowed on a document in `status`.
pub fn allows(status: DocumentStatus, action: DocumentAction) -> bool {
    use DocumentAction as A;
    use DocumentStatus as S;
    matches!(
        (status, action),
        (S::Draft, A::Edit)
            | (S::Draft, A::Publish)
            | (S::Draft, A::Delete)
            | (S::Draft, A::Archive)
            | (S::Published, A::Revise)
            | (S::Published, A::Archive)
            | (S::Published, A::Acknowledge)
    )
}

pub fn ensure_allowed(status: DocumentStatus, action: DocumentAction) -> Result<(), CoreError> {
    if allows(status, action) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "A {status} document cannot be {}",
            action.verb()
        )))
    }
}

/// Validate a document code: 2..=32 chars of uppercase letters, digits and `-`.
pub fn validate_code(code: &str) -> Result<(), CoreError> {
    let ok = (2..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Document code '{code}' must be 2-32 characters of A-Z, 0-9 and '-'"
        )))
    }
}
