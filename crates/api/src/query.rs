//! Shared query parameter types for API handlers.
//!
//! Common query structs that appear across multiple handler modules are
//! extracted here to avoid duplication.

use clinicops_core::pagination::Page;
use serde::Deserialize;

/// Generic pagination parameters (`?page=&limit=`).
///
/// Normalized into a [`Page`] via [`PaginationParams::page`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Query parameters for list endpoints that support an `include_inactive` flag.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `?format=csv|xlsx` for export endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FormatParams {
    pub format: Option<String>,
}
