//! Hybrid extraction policy
//!
//! Small documents are read page by page; large ones are indexed once and
//! queried through retrieval. Sizes and cursors are counted in characters.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_RETRIEVAL_THRESHOLD: usize = 20_000;

/// How a document should be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionRoute {
    Paginate,
    Retrieve,
}

/// One bounded slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub slice: String,
    /// Cursor of the following slice, `None` on the last one
    pub next_cursor: Option<usize>,
    /// Length of the whole document
    pub total_chars: usize,
}

impl ExtractedPage {
    /// Cut the slice starting at character `cursor` out of `text`.
    pub fn from_text(text: &str, cursor: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_chars = text.chars().count();
        let slice: String = text.chars().skip(cursor).take(page_size).collect();
        let end = cursor.saturating_add(page_size);
        let next_cursor = (end < total_chars).then_some(end);

        Self {
            slice,
            next_cursor,
            total_chars,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    pub page_size: usize,
    pub retrieval_threshold: usize,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            retrieval_threshold: DEFAULT_RETRIEVAL_THRESHOLD,
        }
    }
}

impl ExtractionPolicy {
    pub fn new(page_size: usize, retrieval_threshold: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            retrieval_threshold,
        }
    }

    pub fn route(&self, total_chars: usize) -> ExtractionRoute {
        if total_chars <= self.retrieval_threshold {
            ExtractionRoute::Paginate
        } else {
            ExtractionRoute::Retrieve
        }
    }

    pub fn total_pages(&self, total_chars: usize) -> usize {
        total_chars.div_ceil(self.page_size).max(1)
    }

    /// Character cursor of a 1-based page number.
    pub fn cursor_for_page(&self, page: usize) -> usize {
        page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Render a page for the model, with a page trailer for multi-page documents.
    pub fn render_page(&self, page: &ExtractedPage, page_number: usize) -> String {
        let total_pages = self.total_pages(page.total_chars);
        if total_pages > 1 {
            format!(
                "{}\n\n**Page #{}. Total pages: {}**",
                page.slice, page_number, total_pages
            )
        } else {
            page.slice.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_by_threshold() {
        let policy = ExtractionPolicy::new(10, 100);
        assert_eq!(policy.route(0), ExtractionRoute::Paginate);
        assert_eq!(policy.route(100), ExtractionRoute::Paginate);
        assert_eq!(policy.route(101), ExtractionRoute::Retrieve);
    }

    #[test]
    fn test_page_slicing() {
        let text = "abcdefghij-klm";
        let first = ExtractedPage::from_text(text, 0, 5);
        assert_eq!(first.slice, "abcde");
        assert_eq!(first.next_cursor, Some(5));
        assert_eq!(first.total_chars, 14);

        let last = ExtractedPage::from_text(text, 10, 5);
        assert_eq!(last.slice, "-klm");
        assert!(!last.has_more());
    }

    #[test]
    fn test_cursor_beyond_end_is_empty() {
        let page = ExtractedPage::from_text("abc", 10, 5);
        assert!(page.slice.is_empty());
        assert!(!page.has_more());
    }

    #[test]
    fn test_total_pages_and_cursor() {
        let policy = ExtractionPolicy::new(10, 1000);
        assert_eq!(policy.total_pages(0), 1);
        assert_eq!(policy.total_pages(10), 1);
        assert_eq!(policy.total_pages(11), 2);
        assert_eq!(policy.cursor_for_page(1), 0);
        assert_eq!(policy.cursor_for_page(3), 20);
    }

    #[test]
    fn test_render_page_trailer() {
        let policy = ExtractionPolicy::new(5, 1000);
        let page = ExtractedPage::from_text("abcdefgh", 5, 5);
        assert_eq!(
            policy.render_page(&page, 2),
            "fgh\n\n**Page #2. Total pages: 2**"
        );

        let single = ExtractedPage::from_text("abc", 0, 5);
        assert_eq!(policy.render_page(&single, 1), "abc");
    }
}
