//! This module defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The number of transactions to return per page.
    pub per_page: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { per_page: 10 }
    }
}

/// The paging summary returned alongside a page of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// The page this response holds, 1-based.
    pub current_page: u64,
    /// The last page that holds any data; 1 when there is no data.
    pub last_page: u64,
    /// The page size used for this response.
    pub per_page: u64,
    /// The total number of items across all pages.
    pub total: u64,
}

/// Compute the paging summary for a page of `total` items.
///
/// `current_page` and `per_page` are clamped to at least 1.
pub fn page_meta(current_page: u64, per_page: u64, total: u64) -> PageMeta {
    let per_page = per_page.max(1);
    let last_page = total.div_ceil(per_page).max(1);

    PageMeta {
        current_page: current_page.max(1),
        last_page,
        per_page,
        total,
    }
}

/// The number of items to skip to reach `page`.
///
/// `per_page` is clamped to at least 1.
pub fn page_offset(page: u64, per_page: u64) -> u64 {
    page.max(1).saturating_sub(1) * per_page.max(1)
}

#[cfg(test)]
mod pagination_tests {
    use crate::pagination::{PageMeta, page_meta, page_offset};

    #[test]
    fn meta_for_a_partial_last_page() {
        let want = PageMeta {
            current_page: 3,
            last_page: 3,
            per_page: 10,
            total: 25,
        };

        assert_eq!(page_meta(3, 10, 25), want);
    }

    #[test]
    fn meta_for_an_exact_page_boundary() {
        assert_eq!(page_meta(1, 10, 20).last_page, 2);
    }

    #[test]
    fn empty_data_still_has_one_page() {
        let meta = page_meta(1, 10, 0);

        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.total, 0);
    }

    #[test]
    fn page_zero_is_clamped_to_one() {
        assert_eq!(page_meta(0, 10, 5).current_page, 1);
        assert_eq!(page_offset(0, 10), 0);
    }

    #[test]
    fn zero_page_size_is_clamped_to_one() {
        let meta = page_meta(1, 0, 5);

        assert_eq!(meta.per_page, 1);
        assert_eq!(meta.last_page, 5);
        assert_eq!(page_offset(3, 0), 2);
    }

    #[test]
    fn offsets_step_by_page_size() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(4, 25), 75);
    }
}
