//! Deterministic windows over a flat ordered identifier list.
//!
//! Each category owns a region of the list starting at `base`. Page `n` of a
//! category always starts at `base + (n - 1) * page_size`, so the same page
//! yields the same slice while the list is stable. [`PageCursor`] adds the
//! forward-only "load more" flow on top of that.

use serde::Serialize;

use super::{CatalogItem, ContentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryWindow {
    pub category: String,
    pub base: usize,
    pub page_size: usize,
}

/// A bounded slice of the identifier list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub ids: Vec<ContentId>,
    pub offset: usize,
    pub exhausted: bool,
}

impl Page {
    /// Offset the following page would start at.
    pub fn next_offset(&self) -> usize {
        self.offset + self.ids.len()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl CategoryWindow {
    pub fn new(category: impl Into<String>, base: usize, page_size: usize) -> Self {
        Self {
            category: category.into(),
            base,
            page_size,
        }
    }

    /// Start offset of a 1-based page. Page 0 is treated as page 1.
    pub fn offset_for_page(&self, page: u32) -> usize {
        let index = page.saturating_sub(1) as usize;
        self.base
            .saturating_add(index.saturating_mul(self.page_size))
    }

    /// Stateless read of page `page`.
    pub fn page<T: CatalogItem>(&self, source: &[T], page: u32) -> Page {
        self.slice_at(source, self.offset_for_page(page))
    }

    pub(crate) fn slice_at<T: CatalogItem>(&self, source: &[T], offset: usize) -> Page {
        let start = offset.min(source.len());
        let end = offset.saturating_add(self.page_size).min(source.len());
        let ids: Vec<ContentId> = source[start..end]
            .iter()
            .map(|item| item.content_id().clone())
            .collect();
        // A zero page size can never make progress.
        let exhausted = self.page_size == 0 || ids.len() < self.page_size;

        Page {
            ids,
            offset,
            exhausted,
        }
    }
}

/// Forward-only paging state for one category.
///
/// Not synchronized: one cursor belongs to one logical request flow.
#[derive(Debug, Clone)]
pub struct PageCursor {
    window: CategoryWindow,
    cursor: usize,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(window: CategoryWindow) -> Self {
        let cursor = window.base;
        Self {
            window,
            cursor,
            exhausted: false,
        }
    }

    /// Resume a cursor at an arbitrary offset, e.g. one echoed back by a
    /// client as a "load more" token.
    pub fn resume(window: CategoryWindow, cursor: usize) -> Self {
        let cursor = cursor.max(window.base);
        Self {
            window,
            cursor,
            exhausted: false,
        }
    }

    pub fn window(&self) -> &CategoryWindow {
        &self.window
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Take the next window and advance.
    ///
    /// A window shorter than `page_size` marks the cursor exhausted; that is
    /// the end-of-data signal, also when the list shrank between calls. Once
    /// exhausted every call returns an empty exhausted page.
    pub fn next_page<T: CatalogItem>(&mut self, source: &[T]) -> Page {
        if self.exhausted {
            return Page {
                ids: Vec::new(),
                offset: self.cursor,
                exhausted: true,
            };
        }

        let page = self.window.slice_at(source, self.cursor);
        self.cursor = self.cursor.saturating_add(self.window.page_size);
        if page.exhausted {
            self.exhausted = true;
        }
        page
    }

    pub fn reset(&mut self) {
        self.cursor = self.window.base;
        self.exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesId;

    fn ids(n: u64) -> Vec<ContentId> {
        (1..=n)
            .map(|i| ContentId::Series(SeriesId::new(i).unwrap()))
            .collect()
    }

    fn numbers(page: &Page) -> Vec<String> {
        page.ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn offsets_are_deterministic() {
        let window = CategoryWindow::new("trending", 10, 7);
        assert_eq!(window.offset_for_page(1), 10);
        assert_eq!(window.offset_for_page(3), 24);
        assert_eq!(window.offset_for_page(0), 10);
    }

    #[test]
    fn same_page_returns_same_slice() {
        let source = ids(100);
        let window = CategoryWindow::new("trending", 0, 20);
        assert_eq!(window.page(&source, 2), window.page(&source, 2));
        assert_eq!(numbers(&window.page(&source, 2))[0], "21");
    }

    #[test]
    fn cursor_partitions_region_without_gaps() {
        let source = ids(51);
        let mut cursor = PageCursor::new(CategoryWindow::new("action", 0, 7));

        let mut seen = Vec::new();
        for _ in 0..7 {
            let page = cursor.next_page(&source);
            assert_eq!(page.len(), 7);
            assert!(!page.exhausted);
            seen.extend(page.ids);
        }

        let last = cursor.next_page(&source);
        assert!(last.exhausted);
        assert_eq!(last.len(), 2);
        seen.extend(last.ids);

        assert_eq!(seen, source);
        assert!(cursor.is_exhausted());
        assert!(cursor.next_page(&source).is_empty());
    }

    #[test]
    fn cursor_starts_at_category_base() {
        let source = ids(100);
        let mut cursor = PageCursor::new(CategoryWindow::new("top-rated", 40, 20));
        let page = cursor.next_page(&source);
        assert_eq!(page.offset, 40);
        assert_eq!(numbers(&page).first().map(String::as_str), Some("41"));
        assert_eq!(cursor.cursor(), 60);
    }

    #[test]
    fn shrinking_source_is_treated_as_exhaustion() {
        let mut source = ids(30);
        let mut cursor = PageCursor::new(CategoryWindow::new("trending", 0, 10));
        assert_eq!(cursor.next_page(&source).len(), 10);

        source.truncate(14);
        let page = cursor.next_page(&source);
        assert_eq!(page.len(), 4);
        assert!(page.exhausted);

        source.truncate(5);
        assert!(cursor.next_page(&source).is_empty());
    }

    #[test]
    fn offset_past_the_end_is_empty_and_exhausted() {
        let source = ids(5);
        let page = CategoryWindow::new("x", 0, 7).page(&source, 4);
        assert!(page.is_empty());
        assert!(page.exhausted);
        assert_eq!(page.offset, 21);
    }

    #[test]
    fn exact_multiple_needs_one_more_call_to_exhaust() {
        let source = ids(14);
        let mut cursor = PageCursor::new(CategoryWindow::new("x", 0, 7));
        assert!(!cursor.next_page(&source).exhausted);
        assert!(!cursor.next_page(&source).exhausted);
        let tail = cursor.next_page(&source);
        assert!(tail.is_empty() && tail.exhausted);
    }

    #[test]
    fn reset_rewinds_to_base() {
        let source = ids(10);
        let mut cursor = PageCursor::new(CategoryWindow::new("x", 2, 20));
        assert!(cursor.next_page(&source).exhausted);
        cursor.reset();
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.cursor(), 2);
    }

    #[test]
    fn resume_never_rewinds_below_base() {
        let cursor = PageCursor::resume(CategoryWindow::new("x", 20, 7), 3);
        assert_eq!(cursor.cursor(), 20);
        let cursor = PageCursor::resume(CategoryWindow::new("x", 20, 7), 34);
        assert_eq!(cursor.cursor(), 34);
    }
}
