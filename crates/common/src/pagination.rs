//! Page selection for feeds.
//!
//! Page numbers are 1-based. A missing or non-numeric page parameter selects
//! page 1; a numeric page outside `1..=num_pages` selects the last page. An
//! empty result still has one (empty) page.

use serde::{Deserialize, Serialize};

/// `?page=` query parameter, kept raw so that junk values fall back to page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Requested page.
    pub page: Option<String>,
}

impl PageQuery {
    /// Query for a specific page.
    #[must_use]
    pub fn of(page: u64) -> Self {
        Self {
            page: Some(page.to_string()),
        }
    }

    /// Raw value of the parameter.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// Number of pages needed for `num_items` at `per_page`, never less than 1.
#[must_use]
pub const fn page_count(num_items: u64, per_page: u64) -> u64 {
    if per_page == 0 || num_items == 0 {
        return 1;
    }
    num_items.div_ceil(per_page)
}

/// Resolve a raw page parameter against the number of available pages.
#[must_use]
pub fn resolve_page_number(raw: Option<&str>, num_pages: u64) -> u64 {
    let num_pages = num_pages.max(1);
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }
    // Any integer that does not fit is out of range.
    match raw.parse::<u64>() {
        Ok(n) if (1..=num_pages).contains(&n) => n,
        _ => num_pages,
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages (at least 1).
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub num_items: u64,
    /// Page size.
    pub per_page: u64,
}

impl<T> Page<T> {
    /// Build a page from already fetched items.
    #[must_use]
    pub fn new(items: Vec<T>, number: u64, num_items: u64, per_page: u64) -> Self {
        Self {
            items,
            number,
            num_pages: page_count(num_items, per_page),
            num_items,
            per_page,
        }
    }

    /// Convert the items, keeping the page metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            num_items: self.num_items,
            per_page: self.per_page,
        }
    }

    /// Replace the items, keeping the page metadata.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            num_items: self.num_items,
            per_page: self.per_page,
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Whether there is more than one page.
    #[must_use]
    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    /// Number of the next page, if any.
    #[must_use]
    pub const fn next_page_number(&self) -> Option<u64> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Number of the previous page, if any.
    #[must_use]
    pub const fn previous_page_number(&self) -> Option<u64> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(15, 10), 2);
        assert_eq!(page_count(21, 10), 3);
    }

    #[test]
    fn test_resolve_missing_or_junk_is_first_page() {
        assert_eq!(resolve_page_number(None, 3), 1);
        assert_eq!(resolve_page_number(Some(""), 3), 1);
        assert_eq!(resolve_page_number(Some("abc"), 3), 1);
        assert_eq!(resolve_page_number(Some("1.5"), 3), 1);
    }

    #[test]
    fn test_resolve_out_of_range_is_last_page() {
        assert_eq!(resolve_page_number(Some("2"), 3), 2);
        assert_eq!(resolve_page_number(Some("4"), 3), 3);
        assert_eq!(resolve_page_number(Some("0"), 3), 3);
        assert_eq!(resolve_page_number(Some("-7"), 3), 3);
        assert_eq!(resolve_page_number(Some("99999999999999999999"), 3), 3);
        assert_eq!(resolve_page_number(Some("-99999999999999999999"), 3), 3);
    }

    #[test]
    fn test_resolve_with_no_pages() {
        assert_eq!(resolve_page_number(Some("5"), 0), 1);
    }

    #[test]
    fn test_navigation() {
        let first = Page::new(vec![1; 10], 1, 15, 10);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next());
        assert!(!first.has_previous());
        assert_eq!(first.next_page_number(), Some(2));
        assert_eq!(first.previous_page_number(), None);

        let second = Page::new(vec![1; 5], 2, 15, 10);
        assert!(!second.has_next());
        assert_eq!(second.previous_page_number(), Some(1));
        assert_eq!(second.len(), 5);

        let only: Page<i32> = Page::new(Vec::new(), 1, 0, 10);
        assert!(!only.has_other_pages());
        assert!(only.is_empty());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 3, 22, 10).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.number, 3);
        assert_eq!(page.num_pages, 3);
    }
}
