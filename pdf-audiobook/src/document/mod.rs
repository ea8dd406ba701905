//! Page-indexed text access to paginated documents.

pub mod poppler;

use crate::error::Result;

pub use poppler::PopplerDocument;

/// One entry of a document's embedded table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Entry title as stored in the document
    pub title: String,
    /// 0-based page index the entry points at
    pub page: usize,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, page: usize) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// Source of per-page plain text for one open document.
pub trait PageSource {
    /// Total number of pages.
    fn page_count(&self) -> usize;

    /// Plain text of a 0-based page.
    fn page_text(&self, page: usize) -> Result<String>;

    /// Embedded table of contents in reading order; empty if the document has none.
    fn table_of_contents(&self) -> Result<Vec<TocEntry>>;

    /// Index of the final page, `None` for an empty document.
    fn last_page(&self) -> Option<usize> {
        self.page_count().checked_sub(1)
    }
}

/// Read a page, treating failures as an empty page.
pub fn read_page_lossy(source: &dyn PageSource, page: usize) -> String {
    match source.page_text(page) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Error extracting text from page {}: {}", page + 1, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDocument;

    #[test]
    fn test_last_page() {
        let doc = MemoryDocument::with_pages(&["a", "b", "c"]);
        assert_eq!(doc.last_page(), Some(2));
        assert_eq!(MemoryDocument::with_pages(&[]).last_page(), None);
    }

    #[test]
    fn test_read_page_lossy_swallows_errors() {
        let doc = MemoryDocument::with_pages(&["first"]).with_unreadable_page(0);
        assert_eq!(read_page_lossy(&doc, 0), "");
        assert_eq!(read_page_lossy(&doc, 7), "");
    }
}
