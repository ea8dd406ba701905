//! Strategies for finding a candidate chapter title on a page.

/// Decides whether a candidate title appears on a page.
pub trait TitleMatcher {
    fn locate(&self, candidate_title: &str, page_text: &str) -> bool;
}

/// Literal substring match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl TitleMatcher for SubstringMatcher {
    fn locate(&self, candidate_title: &str, page_text: &str) -> bool {
        page_text.contains(candidate_title)
    }
}

/// Substring match after collapsing whitespace runs on both sides.
///
/// Catches titles that the page layout wrapped across lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceInsensitiveMatcher;

impl TitleMatcher for WhitespaceInsensitiveMatcher {
    fn locate(&self, candidate_title: &str, page_text: &str) -> bool {
        let title = collapse_whitespace(candidate_title);
        if title.is_empty() {
            return false;
        }
        collapse_whitespace(page_text).contains(&title)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matcher selection, as exposed on the command line and in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Whitespace,
}

impl MatchMode {
    pub fn matcher(self) -> Box<dyn TitleMatcher> {
        match self {
            MatchMode::Exact => Box::new(SubstringMatcher),
            MatchMode::Whitespace => Box::new(WhitespaceInsensitiveMatcher),
        }
    }
}
