//! Chapter boundary resolution.

use super::matcher::TitleMatcher;
use super::ChapterBoundary;
use crate::document::{read_page_lossy, PageSource, TocEntry};
use crate::error::{PipelineError, Result};
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Page ranges used by the heuristic scan (0-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    /// Front-matter pages holding the printed table of contents
    pub toc_pages: RangeInclusive<usize>,
    /// First body page to search for chapter titles
    pub content_start: usize,
}

impl ScanRange {
    /// Build from the 1-based page numbers a reader sees.
    pub fn from_page_numbers(toc_start: usize, toc_end: usize, content_start: usize) -> Self {
        Self {
            toc_pages: toc_start.saturating_sub(1)..=toc_end.saturating_sub(1),
            content_start: content_start.saturating_sub(1),
        }
    }
}

/// How chapters should be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterStrategy {
    /// Embedded table of contents, falling back to the heuristic scan
    #[default]
    Auto,
    /// Heuristic scan only
    Scan,
    /// Fixed number of pages per chapter
    FixedPages(usize),
}

/// Which method actually produced the boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    EmbeddedIndex,
    HeuristicScan,
    FixedPages,
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionMethod::EmbeddedIndex => write!(f, "embedded-index"),
            ResolutionMethod::HeuristicScan => write!(f, "heuristic-scan"),
            ResolutionMethod::FixedPages => write!(f, "fixed-pages"),
        }
    }
}

/// Resolved chapter structure.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub method: ResolutionMethod,
    pub boundaries: Vec<ChapterBoundary>,
}

/// Resolve chapters with the given strategy.
///
/// `on_page(scanned, total)` is called after each body page of a heuristic scan.
pub fn resolve<F>(
    source: &dyn PageSource,
    strategy: ChapterStrategy,
    range: &ScanRange,
    matcher: &dyn TitleMatcher,
    on_page: F,
) -> Result<Resolution>
where
    F: FnMut(usize, usize),
{
    match strategy {
        ChapterStrategy::FixedPages(pages) => Ok(Resolution {
            method: ResolutionMethod::FixedPages,
            boundaries: resolve_fixed_pages(source.page_count(), pages)?,
        }),
        ChapterStrategy::Scan => Ok(Resolution {
            method: ResolutionMethod::HeuristicScan,
            boundaries: resolve_by_scan(source, range, matcher, on_page)?,
        }),
        ChapterStrategy::Auto => {
            let toc = source.table_of_contents()?;
            match resolve_from_toc(&toc, source.page_count()) {
                Ok(boundaries) => Ok(Resolution {
                    method: ResolutionMethod::EmbeddedIndex,
                    boundaries,
                }),
                Err(PipelineError::NoTableOfContents) => {
                    log::info!("No embedded table of contents, scanning pages for chapter titles");
                    Ok(Resolution {
                        method: ResolutionMethod::HeuristicScan,
                        boundaries: resolve_by_scan(source, range, matcher, on_page)?,
                    })
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// Derive boundaries directly from an embedded table of contents.
pub fn resolve_from_toc(entries: &[TocEntry], page_count: usize) -> Result<Vec<ChapterBoundary>> {
    let Some(last_page) = page_count.checked_sub(1) else {
        return Err(PipelineError::NoTableOfContents);
    };

    let starts: Vec<(String, usize)> = entries
        .iter()
        .filter(|entry| {
            let in_range = entry.page <= last_page;
            if !in_range {
                log::warn!(
                    "Ignoring TOC entry '{}' pointing past the last page ({})",
                    entry.title,
                    entry.page + 1
                );
            }
            in_range
        })
        .map(|entry| (entry.title.clone(), entry.page))
        .collect();

    if starts.is_empty() {
        return Err(PipelineError::NoTableOfContents);
    }

    let boundaries = boundaries_from_starts(starts, last_page);
    log::info!("Identified {} chapters from the embedded index.", boundaries.len());
    Ok(boundaries)
}

/// Split front-matter text into candidate titles.
///
/// Every trimmed non-empty line is a candidate; duplicates are preserved.
pub fn parse_candidates(toc_text: &str) -> Vec<String> {
    toc_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the front-matter pages and return candidate titles.
pub fn read_candidates(source: &dyn PageSource, toc_pages: &RangeInclusive<usize>) -> Vec<String> {
    let mut toc_text = String::new();
    for page in toc_pages.clone().take_while(|p| *p < source.page_count()) {
        toc_text.push_str(&read_page_lossy(source, page));
        toc_text.push('\n');
    }
    let candidates = parse_candidates(&toc_text);
    log::info!("Identified {} candidate chapter titles.", candidates.len());
    candidates
}

/// Locate front-matter titles in the body pages.
///
/// Titles never found are dropped. A title first found on the same page as
/// an earlier candidate is folded into that earlier chapter, so a located
/// title can also be missing from the result.
pub fn resolve_by_scan<F>(
    source: &dyn PageSource,
    range: &ScanRange,
    matcher: &dyn TitleMatcher,
    on_page: F,
) -> Result<Vec<ChapterBoundary>>
where
    F: FnMut(usize, usize),
{
    let candidates = read_candidates(source, &range.toc_pages);
    let last_page = source
        .last_page()
        .ok_or(PipelineError::NoChaptersIdentified)?;

    let located = locate_candidates(source, &candidates, range.content_start, matcher, on_page);

    let starts: Vec<(String, usize)> = candidates
        .iter()
        .zip(located)
        .filter_map(|(title, page)| match page {
            Some(page) => Some((title.clone(), page)),
            None => {
                log::debug!("Candidate '{}' was not found in the body; dropping it", title);
                None
            }
        })
        .collect();

    if starts.is_empty() {
        return Err(PipelineError::NoChaptersIdentified);
    }

    let boundaries = boundaries_from_starts(starts, last_page);
    log::info!("Identified {} chapters by scanning pages.", boundaries.len());
    Ok(boundaries)
}

/// First matching body page per candidate, in candidate order.
///
/// A title string is located once; later duplicates of it stay unresolved.
fn locate_candidates<F>(
    source: &dyn PageSource,
    candidates: &[String],
    content_start: usize,
    matcher: &dyn TitleMatcher,
    mut on_page: F,
) -> Vec<Option<usize>>
where
    F: FnMut(usize, usize),
{
    let mut located: Vec<Option<usize>> = vec![None; candidates.len()];
    let mut found_titles: HashSet<&str> = HashSet::new();
    let page_count = source.page_count();
    let total = page_count.saturating_sub(content_start);

    for (scanned, page) in (content_start..page_count).enumerate() {
        let text = read_page_lossy(source, page);

        for (slot, title) in located.iter_mut().zip(candidates) {
            if slot.is_some() || found_titles.contains(title.as_str()) {
                continue;
            }
            if matcher.locate(title, &text) {
                log::debug!("Found chapter '{}' on page {}", title, page + 1);
                *slot = Some(page);
                found_titles.insert(title.as_str());
            }
        }

        on_page(scanned + 1, total);

        if found_titles.len() == candidates.len() {
            break;
        }
    }

    located
}

/// Split the whole document into chapters of `pages_per_chapter` pages.
pub fn resolve_fixed_pages(page_count: usize, pages_per_chapter: usize) -> Result<Vec<ChapterBoundary>> {
    if page_count == 0 || pages_per_chapter == 0 {
        return Err(PipelineError::NoChaptersIdentified);
    }

    let boundaries = (0..page_count)
        .step_by(pages_per_chapter)
        .enumerate()
        .map(|(i, start)| {
            let end = (start + pages_per_chapter).min(page_count) - 1;
            ChapterBoundary::new(format!("Chapter {}", i + 1), start, end)
        })
        .collect();
    Ok(boundaries)
}

/// Turn (title, start page) pairs into contiguous boundaries ending at `last_page`.
///
/// Ordering is by start page with ties kept in input order; an entry sharing
/// its start page with an earlier one is folded into that earlier chapter.
fn boundaries_from_starts(mut starts: Vec<(String, usize)>, last_page: usize) -> Vec<ChapterBoundary> {
    starts.sort_by_key(|(_, page)| *page);
    starts.dedup_by(|later, earlier| {
        let same_page = later.1 == earlier.1;
        if same_page {
            log::debug!(
                "'{}' starts on the same page as '{}'; merging into the earlier chapter",
                later.0,
                earlier.0
            );
        }
        same_page
    });

    let next_starts: Vec<Option<usize>> = starts
        .iter()
        .skip(1)
        .map(|(_, page)| Some(*page))
        .chain(std::iter::once(None))
        .collect();

    starts
        .into_iter()
        .zip(next_starts)
        .map(|((title, start), next)| {
            let end = next.map(|n| n - 1).unwrap_or(last_page);
            ChapterBoundary::new(title, start, end)
        })
        .collect()
}
