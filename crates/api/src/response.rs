//! Shared response envelope types for API handlers.
//!
//! Single resources use `{ "data": ... }`; list endpoints add a `meta`
//! block with pagination totals.

use clinicops_core::pagination::{Page, PageMeta};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": [...], "meta": { page, limit, total, total_pages } }`.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            data,
            meta: PageMeta::new(page, total),
        }
    }
}
