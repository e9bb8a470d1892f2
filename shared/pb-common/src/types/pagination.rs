//! Offset Pagination Envelope

use serde::{Deserialize, Serialize};

/// Pagination metadata returned next to a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PageMeta {
    /// 1-based page number that was served.
    pub current_page: i64,
    /// Fixed page size.
    pub per_page: i64,
    /// Total matching items across all pages.
    pub total: i64,
    /// Last page number (at least 1, even when there are no items).
    pub last_page: i64,
    /// 1-based position of the first item on this page, `None` when empty.
    pub from: Option<i64>,
    /// 1-based position of the last item on this page, `None` when empty.
    pub to: Option<i64>,
}

impl PageMeta {
    /// Build metadata for `page` given the number of items it actually holds.
    #[must_use]
    pub fn new(current_page: i64, per_page: i64, total: i64, items_on_page: usize) -> Self {
        let per_page = per_page.max(1);
        let last_page = ((total + per_page - 1) / per_page).max(1);
        let (from, to) = if items_on_page == 0 {
            (None, None)
        } else {
            let first = (current_page - 1) * per_page + 1;
            (Some(first), Some(first + items_on_page as i64 - 1))
        };

        Self {
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

/// A page of items with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64) -> Self {
        let meta = PageMeta::new(current_page, per_page, total, data.len());
        Self { data, meta }
    }

    /// Convert every item while keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
