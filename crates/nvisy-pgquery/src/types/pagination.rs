//! Limit-offset pagination over 1-based page numbers.

use serde::{Deserialize, Serialize};

use crate::{PgError, PgResult};

/// A validated page request.
///
/// Pages are 1-based. A zero page or a zero page size is rejected when the
/// value is constructed, never silently corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct Pagination {
    page: u64,
    per_page: u64,
    offset: i64,
    limit: i64,
}

#[derive(Deserialize)]
struct RawPagination {
    page: u64,
    per_page: u64,
}

impl TryFrom<RawPagination> for Pagination {
    type Error = PgError;

    fn try_from(value: RawPagination) -> Result<Self, Self::Error> {
        Self::new(value.page, value.per_page)
    }
}

impl Pagination {
    /// Validates `page` and `per_page` and computes the offset/limit pair.
    ///
    /// # Errors
    ///
    /// Returns [`PgError::Config`] when `page` or `per_page` is zero, or
    /// when the offset does not fit a signed 64-bit integer.
    pub fn new(page: u64, per_page: u64) -> PgResult<Self> {
        if page < 1 {
            return Err(PgError::Config("page must be at least 1".to_string()));
        }

        if per_page < 1 {
            return Err(PgError::Config("per_page must be at least 1".to_string()));
        }

        let offset = (page - 1)
            .checked_mul(per_page)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(|| PgError::Config(format!("page {page} is out of range")))?;
        let limit = i64::try_from(per_page)
            .map_err(|_| PgError::Config(format!("per_page {per_page} is out of range")))?;

        Ok(Self {
            page,
            per_page,
            offset,
            limit,
        })
    }

    /// Returns the requested page (1-based).
    #[inline]
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Returns the page size.
    #[inline]
    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Returns the number of rows to skip.
    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns the maximum number of rows to return.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Returns the number of pages needed for `total` rows.
    #[inline]
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page)
    }
}

/// Result of a paginated select.
#[derive(Debug, Clone)]
pub struct PaginatedPage<T> {
    /// Total number of rows matching the query, across all pages.
    pub total: u64,
    /// Number of pages for `total` at the requested page size.
    pub total_pages: u64,
    /// The requested page, or 1 when the requested page came back empty.
    pub effective_page: u64,
    /// Rows on this page.
    pub items: Vec<T>,
}

impl<T> PaginatedPage<T> {
    /// Assembles a page from the rows and total count of a query.
    pub fn new(pagination: &Pagination, total: u64, items: Vec<T>) -> Self {
        let effective_page = if items.is_empty() {
            1
        } else {
            pagination.page()
        };

        Self {
            total,
            total_pages: pagination.total_pages(total),
            effective_page,
            items,
        }
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> PaginatedPage<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedPage {
            total: self.total,
            total_pages: self.total_pages,
            effective_page: self.effective_page,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
