//! Pagination request/response envelope.
//!
//! # Invariants
//! - `page >= 1` and `1 <= limit <= max` after normalization.
//! - `pages == ceil(total / limit)`; an empty result has `pages == 0`.

use serde::Serialize;

/// Caller-provided page coordinates. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamps coordinates into range: page 0 becomes 1, limit 0 takes
    /// `default_limit`, and limits above `max_limit` are capped.
    pub fn normalized(self, default_limit: u32, max_limit: u32) -> Self {
        let limit = if self.limit == 0 {
            default_limit
        } else {
            self.limit
        };
        Self {
            page: self.page.max(1),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    /// Rows to skip: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 0 }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            pages: page_count(total, request.limit),
        }
    }

    pub fn is_last(&self) -> bool {
        u64::from(self.page) >= self.pages
    }
}

fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}
