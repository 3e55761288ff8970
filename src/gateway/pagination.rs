//! Page arithmetic for list endpoints.

use serde::{Deserialize, Serialize};

/// Pagination block attached to every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub items_per_page: u32,
}

impl Pagination {
    /// Builds the block for `total_items` split into pages of `items_per_page`.
    ///
    /// `total_pages` is `ceil(total_items / items_per_page)`, or 1 when the
    /// page size is zero.
    #[must_use]
    pub const fn new(total_items: u64, current_page: u32, items_per_page: u32) -> Self {
        let total_pages = if items_per_page == 0 {
            1
        } else {
            total_items.div_ceil(items_per_page as u64)
        };
        Self {
            total_items,
            total_pages,
            current_page,
            items_per_page,
        }
    }
}

/// A page of items plus its pagination block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Slices one page out of a fully-fetched list.
///
/// Pages are 1-based; page 0 is treated as page 1.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Paginated<T> {
    let page = page.max(1);
    let total = items.len() as u64;
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let data = items
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();
    Paginated {
        data,
        pagination: Pagination::new(total, page, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(250, 1, 10).total_pages, 25);
        assert_eq!(Pagination::new(251, 1, 10).total_pages, 26);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
    }

    #[test]
    fn zero_page_size_is_one_page() {
        let p = Pagination::new(42, 1, 0);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.items_per_page, 0);
    }

    #[test]
    fn paginate_slices_requested_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.data, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.pagination.total_items, 25);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.current_page, 3);
    }

    #[test]
    fn paginate_past_end_is_empty() {
        let page = paginate(vec!["a", "b"], 5, 10);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn paginate_page_zero_is_first_page() {
        let page = paginate(vec![1, 2, 3], 0, 2);
        assert_eq!(page.data, vec![1, 2]);
        assert_eq!(page.pagination.current_page, 1);
    }

    #[test]
    fn pagination_serialises_snake_case() {
        let value = serde_json::to_value(Pagination::new(5, 1, 2)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "total_items": 5,
                "total_pages": 3,
                "current_page": 1,
                "items_per_page": 2
            })
        );
    }
}
