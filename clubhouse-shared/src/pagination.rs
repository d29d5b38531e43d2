//! Pagination for list endpoints
//!
//! Every list endpoint accepts `page` and `per_page` query parameters and
//! returns a `pagination` block alongside the items.
//!
//! # Example
//!
//! ```
//! use clubhouse_shared::pagination::{PageRequest, Pagination};
//!
//! let request = PageRequest::new(Some(2), Some(10), 20);
//! assert_eq!(request.offset(), 10);
//!
//! let pagination = Pagination::new(&request, 25);
//! assert_eq!(pagination.pages, 3);
//! assert!(pagination.has_next);
//! assert!(pagination.has_prev);
//! ```

use serde::Serialize;

/// Largest page size a client may request
pub const MAX_PER_PAGE: i64 = 100;

/// Highest page number accepted; keeps the row offset within `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Builds a page request, clamping `page` to `1..=MAX_PAGE` and
    /// `per_page` to `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Pagination metadata returned with every list
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        Self {
            page: request.page,
            pages,
            per_page: request.per_page,
            total,
            has_next: request.page < pages,
            has_prev: request.page > 1,
        }
    }
}

/// Clamps a `limit` query parameter for the short "top N" lists
pub fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_PER_PAGE)
}
