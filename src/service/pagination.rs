//! Slice pagination over a fully materialized list

use serde::Serialize;

/// One page of `T`
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number, after clamping
    pub page: usize,
    pub per_page: usize,
    /// Number of items across all pages
    pub total: usize,
}

impl<T> Page<T> {
    /// `ceil(total / per_page)`, never less than 1
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Take page `page` (1-based) of `items`.
///
/// Page numbers below 1 are treated as 1. A page past the end yields an
/// empty `items` but keeps the requested page number so the view can link
/// back.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let start = (page - 1).saturating_mul(per_page);

    let slice = if start >= items.len() {
        &[][..]
    } else {
        let end = start.saturating_add(per_page).min(items.len());
        &items[start..end]
    };

    Page {
        items: slice.to_vec(),
        page,
        per_page,
        total: items.len(),
    }
}
