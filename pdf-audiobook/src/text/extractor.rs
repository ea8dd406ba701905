//! Builds chapter text units from page text and writes them out.

use super::{ChapterTextUnit, PersistedUnit};
use crate::chapters::ChapterBoundary;
use crate::document::{read_page_lossy, PageSource};
use crate::error::{PipelineError, Result};
use std::path::Path;

const MAX_SLUG_LEN: usize = 64;

/// Concatenate each boundary's pages, verbatim, into one unit per chapter.
pub fn extract_units(source: &dyn PageSource, boundaries: &[ChapterBoundary]) -> Vec<ChapterTextUnit> {
    log::info!("Extracting the content for each chapter...");

    boundaries
        .iter()
        .enumerate()
        .map(|(i, boundary)| {
            let text: String = (boundary.start_page..=boundary.end_page)
                .map(|page| read_page_lossy(source, page))
                .collect();
            log::info!(
                "Extracted text for chapter '{}' from pages {} to {}",
                boundary.title,
                boundary.start_page + 1,
                boundary.end_page + 1
            );
            ChapterTextUnit::new(i + 1, boundary.title.clone(), text)
        })
        .collect()
}

/// Write each unit to `text_dir`; see [`persist_units_with`].
pub fn persist_units(units: Vec<ChapterTextUnit>, text_dir: &Path) -> Result<Vec<PersistedUnit>> {
    persist_units_with(units, text_dir, |path, text| std::fs::write(path, text))
}

/// Write each unit with `write`, skipping units whose write fails.
///
/// Fails with `NoChaptersSaved` only when nothing could be written.
pub fn persist_units_with<W>(
    units: Vec<ChapterTextUnit>,
    text_dir: &Path,
    mut write: W,
) -> Result<Vec<PersistedUnit>>
where
    W: FnMut(&Path, &str) -> std::io::Result<()>,
{
    log::info!("Saving chapters into individual text files...");
    let mut persisted = Vec::with_capacity(units.len());

    for unit in units {
        let path = text_dir.join(unit.file_name());
        match write(&path, &unit.text) {
            Ok(()) => {
                log::debug!(
                    "Saved chapter '{}' ({} words) to '{}'",
                    unit.title,
                    unit.word_count(),
                    path.display()
                );
                persisted.push(PersistedUnit { unit, path });
            }
            Err(e) => {
                log::error!("Error saving chapter {} '{}': {}", unit.index, unit.title, e);
            }
        }
    }

    if persisted.is_empty() {
        return Err(PipelineError::NoChaptersSaved);
    }

    Ok(persisted)
}

/// Filesystem-safe form of a chapter title.
///
/// Keeps alphanumerics, joins words with `_`, and never returns an empty string.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    let slug: String = kept
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect();

    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
