//! Chapter text units: extraction from pages and persistence.

pub mod extractor;

use std::path::PathBuf;

pub use extractor::{extract_units, persist_units, persist_units_with, slugify};

/// The text of one chapter, ready for speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTextUnit {
    /// 1-based chapter index in reading order
    pub index: usize,
    /// Chapter title
    pub title: String,
    /// Concatenated page text
    pub text: String,
}

impl ChapterTextUnit {
    pub fn new(index: usize, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            text: text.into(),
        }
    }

    /// Artifact file name: index plus a filesystem-safe title slug.
    pub fn file_name(&self) -> String {
        format!("chapter_{:03}_{}.txt", self.index, slugify(&self.title))
    }

    /// Approximate word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A text unit that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUnit {
    pub unit: ChapterTextUnit,
    pub path: PathBuf,
}
