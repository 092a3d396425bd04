use clinicops_core::types::DbId;
use serde::{Deserialize, Serialize};

/// Recipients of the notification an event produces.
///
/// Whatever the variant, the acting user is left out at delivery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Audience {
    /// Informational event, nobody is notified.
    None,
    User(DbId),
    Users(Vec<DbId>),
    /// Active users whose role is in the list.
    Roles(Vec<String>),
    AllActive,
}

impl Audience {
    pub fn roles(roles: &[&str]) -> Self {
        Self::Roles(roles.iter().map(|r| r.to_string()).collect())
    }

    /// True when delivery can be skipped without a database lookup.
    pub fn is_nobody(&self) -> bool {
        match self {
            Self::None => true,
            Self::Users(ids) => ids.is_empty(),
            Self::Roles(roles) => roles.is_empty(),
            Self::User(_) | Self::AllActive => false,
        }
    }
}
