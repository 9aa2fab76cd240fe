//! Highlighting results

use std::fmt;

use super::emitter::TokenTree;
use super::scanner::Frame;

/// Where and why a scan hit an illegal match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalContext {
    pub message: String,
    /// Byte offset of the illegal match
    pub index: usize,
    /// Input around the offset
    pub context: String,
    /// Label of the mode the match was illegal in
    pub mode: String,
    pub language: String,
    /// HTML of everything highlighted before the match
    pub result_so_far: String,
}

impl fmt::Display for IllegalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at byte {} in {} (near {:?})",
            self.message, self.index, self.language, self.context
        )
    }
}

/// Output of one highlight call
#[derive(Debug, Clone)]
pub struct HighlightResult {
    /// Language used; `None` for the plain-text fallback of auto-detection
    pub language: Option<String>,
    /// Rendered HTML
    pub value: String,
    pub relevance: u32,
    pub illegal: bool,
    pub illegal_by: Option<IllegalContext>,
    /// Engine fault that was recovered from
    pub error_raised: Option<String>,
    /// Runner-up of auto-detection
    pub second_best: Option<Box<HighlightResult>>,
    pub tree: TokenTree,
    /// Mode stack at the end of the scan, for continuing in a later call
    pub(crate) top: Vec<Frame>,
}

impl HighlightResult {
    pub(crate) fn new(language: Option<String>, tree: TokenTree, prefix: &str) -> Self {
        Self {
            language,
            value: tree.to_html(prefix),
            relevance: 0,
            illegal: false,
            illegal_by: None,
            error_raised: None,
            second_best: None,
            tree,
            top: Vec::new(),
        }
    }

    /// The input as unhighlighted text
    pub(crate) fn plain(language: Option<String>, code: &str, prefix: &str) -> Self {
        let mut tree = TokenTree::new();
        tree.add_text(code);
        tree.finalize();
        Self::new(language, tree, prefix)
    }

    /// The plain text the result was built from
    pub fn text(&self) -> String {
        self.tree.text()
    }
}

/// Options of [`Registry::highlight`](super::registry::Registry::highlight)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOptions {
    pub language: String,
    /// Treat illegal matches as ordinary text
    pub ignore_illegals: bool,
}

impl HighlightOptions {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            ignore_illegals: true,
        }
    }

    pub fn strict_illegals(mut self) -> Self {
        self.ignore_illegals = false;
        self
    }
}
