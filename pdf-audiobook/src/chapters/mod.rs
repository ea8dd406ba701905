//! Chapter structure of a paginated document.

pub mod matcher;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use matcher::{MatchMode, SubstringMatcher, TitleMatcher, WhitespaceInsensitiveMatcher};
pub use resolver::{ChapterStrategy, Resolution, ResolutionMethod, ScanRange, resolve};

/// A chapter's title and inclusive 0-based page span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterBoundary {
    pub title: String,
    pub start_page: usize,
    pub end_page: usize,
}

impl ChapterBoundary {
    pub fn new(title: impl Into<String>, start_page: usize, end_page: usize) -> Self {
        Self {
            title: title.into(),
            start_page,
            end_page,
        }
    }

    /// Number of pages spanned.
    pub fn page_len(&self) -> usize {
        self.end_page - self.start_page + 1
    }
}
