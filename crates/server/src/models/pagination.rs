//! Pagination parameters and page envelopes.

use serde::{Deserialize, Serialize};

/// Default page size when none is requested.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Raw `page` / `per_page` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Clamped pagination: `page >= 1`, `1 <= per_page <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        Self {
            page: params.page.unwrap_or(1).max(1),
            per_page: params
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }
}

impl Pagination {
    /// SQL `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.per_page
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clamp(page: Option<i64>, per_page: Option<i64>) -> Pagination {
        PageParams { page, per_page }.into()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            clamp(None, None),
            Pagination {
                page: 1,
                per_page: DEFAULT_PER_PAGE
            }
        );
    }

    #[test]
    fn test_clamps_out_of_range_values() {
        assert_eq!(clamp(Some(0), Some(0)), Pagination { page: 1, per_page: 1 });
        assert_eq!(clamp(Some(-5), Some(1000)).per_page, MAX_PER_PAGE);
        assert_eq!(clamp(Some(-5), Some(1000)).page, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(clamp(Some(3), Some(25)).offset(), 50);
        assert_eq!(clamp(Some(1), Some(25)).offset(), 0);
    }
}
