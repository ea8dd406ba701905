//! PDF page text via the poppler command-line utilities.
//!
//! `pdfinfo` supplies the page count, `pdftotext` one page at a time supplies
//! text, and the outline section of `pdftohtml -xml` supplies the embedded
//! table of contents.

use super::{PageSource, TocEntry};
use crate::error::{PipelineError, Result};
use crate::tools::ToolPaths;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static PAGES_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").expect("valid pages regex"));

static OUTLINE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<item\s+page="(\d+)"\s*>([^<]*)</item>"#).expect("valid outline regex")
});

/// A PDF opened through poppler.
pub struct PopplerDocument {
    path: PathBuf,
    page_count: usize,
    tools: ToolPaths,
    /// Pages are read during both chapter resolution and text extraction.
    cache: RefCell<HashMap<usize, String>>,
}

impl PopplerDocument {
    /// Open a PDF and read its page count.
    pub fn open(path: &Path, tools: &ToolPaths) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::DocumentOpen {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }

        let output = tools
            .poppler("pdfinfo")
            .arg(path)
            .output()
            .map_err(|e| PipelineError::DocumentOpen {
                path: path.to_path_buf(),
                message: format!("failed to run pdfinfo: {}", e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::DocumentOpen {
                path: path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info = String::from_utf8_lossy(&output.stdout);
        let page_count = parse_page_count(&info).ok_or_else(|| PipelineError::DocumentOpen {
            path: path.to_path_buf(),
            message: "pdfinfo reported no page count".to_string(),
        })?;

        log::debug!("Opened {} ({} pages)", path.display(), page_count);

        Ok(Self {
            path: path.to_path_buf(),
            page_count,
            tools: tools.clone(),
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for PopplerDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, page: usize) -> Result<String> {
        if let Some(text) = self.cache.borrow().get(&page) {
            return Ok(text.clone());
        }

        if page >= self.page_count {
            return Err(PipelineError::PageText {
                page,
                message: format!("document has {} pages", self.page_count),
            });
        }

        let number = (page + 1).to_string();
        let output = self
            .tools
            .poppler("pdftotext")
            .args(["-f", &number, "-l", &number, "-enc", "UTF-8"])
            .arg(&self.path)
            .arg("-")
            .output()
            .map_err(|e| PipelineError::PageText {
                page,
                message: format!("failed to run pdftotext: {}", e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::PageText {
                page,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // pdftotext terminates every page with a form feed
        let text = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\u{c}')
            .to_string();
        log::debug!("Extracted text from page {}", page + 1);

        self.cache.borrow_mut().insert(page, text.clone());
        Ok(text)
    }

    fn table_of_contents(&self) -> Result<Vec<TocEntry>> {
        let output = match self
            .tools
            .poppler("pdftohtml")
            .args(["-xml", "-i", "-q", "-stdout"])
            .arg(&self.path)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Could not run pdftohtml, skipping the embedded outline: {}", e);
                return Ok(Vec::new());
            }
        };

        if !output.status.success() {
            log::warn!(
                "pdftohtml failed, treating document as having no outline: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(Vec::new());
        }

        Ok(parse_outline(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_page_count(info: &str) -> Option<usize> {
    PAGES_LINE
        .captures(info)
        .and_then(|caps| caps[1].parse().ok())
}

/// Flatten every outline item (nested or not) in document order.
fn parse_outline(xml: &str) -> Vec<TocEntry> {
    let Some(start) = xml.find("<outline") else {
        return Vec::new();
    };

    OUTLINE_ITEM
        .captures_iter(&xml[start..])
        .filter_map(|caps| {
            let page: usize = caps[1].parse().ok()?;
            let title = unescape_xml(caps[2].trim());
            if title.is_empty() || page == 0 {
                return None;
            }
            Some(TocEntry::new(title, page - 1))
        })
        .collect()
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_count() {
        let info = "Title:          A Book\nProducer:       pdfTeX\nPages:          25\nEncrypted:      no\n";
        assert_eq!(parse_page_count(info), Some(25));
        assert_eq!(parse_page_count("Title: nothing\n"), None);
    }

    #[test]
    fn test_parse_outline_nested() {
        let xml = r#"<?xml version="1.0"?>
<pdf2xml>
<page number="1"><text>Contents</text></page>
<outline>
<item page="6">Part One &amp; Two</item>
<outline>
<item page="6">Chapter 1</item>
<item page="13">Chapter 2</item>
</outline>
<item page="21">Epilogue</item>
<item>Dangling</item>
</outline>
</pdf2xml>"#;
        let toc = parse_outline(xml);
        assert_eq!(
            toc,
            vec![
                TocEntry::new("Part One & Two", 5),
                TocEntry::new("Chapter 1", 5),
                TocEntry::new("Chapter 2", 12),
                TocEntry::new("Epilogue", 20),
            ]
        );
    }

    #[test]
    fn test_parse_outline_absent() {
        let xml = "<pdf2xml><page number=\"1\"></page></pdf2xml>";
        assert!(parse_outline(xml).is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let result = PopplerDocument::open(Path::new("/nonexistent/book.pdf"), &ToolPaths::default());
        assert!(matches!(result, Err(PipelineError::DocumentOpen { .. })));
    }
}
