//! `page` / `limit` pagination shared by every list endpoint.

use serde::Serialize;

/// Page size used when the client sends no `limit`.
pub const DEFAULT_LIMIT: i64 = 20;

/// Upper bound for `limit`.
pub const MAX_LIMIT: i64 = 100;

/// Upper bound for `page`. Keeps `offset` far from `i64` overflow.
pub const MAX_PAGE: i64 = 1_000_000;

/// A normalized page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    /// Normalize raw query values: `page` defaults to 1 and is clamped to
    /// `1..=MAX_PAGE`, `limit` defaults to [`DEFAULT_LIMIT`] and is clamped
    /// to `1..=MAX_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: Page, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + page.limit - 1) / page.limit
        };
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
        }
    }
}
