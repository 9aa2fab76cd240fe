//! Keyword tables
//!
//! Grammars declare keywords as a space-separated string, a list, or a map
//! from category to either of those. The compiler flattens all three into
//! one table from word to (category, relevance).

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Category used when keywords are given without one
pub const DEFAULT_CATEGORY: &str = "keyword";

/// Map key that carries an identifier pattern instead of a category
const PATTERN_KEY: &str = "$pattern";

/// Words so common in prose and code alike that they carry no relevance
/// unless the grammar gives them an explicit score
const COMMON_KEYWORDS: &[&str] = &[
    "of", "and", "for", "in", "not", "or", "if", "then", "parent", "list", "value",
];

/// A set of keywords as written in a grammar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeywordSet {
    /// Space-separated words, each optionally suffixed with `|relevance`
    Words(String),
    /// One word per entry, same `|relevance` suffix rule
    List(Vec<String>),
    /// Category name to the words in that category
    Categories(BTreeMap<String, KeywordSet>),
}

/// Keywords of a mode plus the pattern that finds candidate words
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "KeywordSet")]
pub struct Keywords {
    /// Identifier pattern; falls back to the grammar's, then `\w+`
    pub pattern: Option<String>,
    pub set: KeywordSet,
}

impl From<KeywordSet> for Keywords {
    fn from(set: KeywordSet) -> Self {
        match set {
            KeywordSet::Categories(mut categories) => {
                let pattern = match categories.remove(PATTERN_KEY) {
                    Some(KeywordSet::Words(source)) => Some(source),
                    _ => None,
                };
                Keywords {
                    pattern,
                    set: KeywordSet::Categories(categories),
                }
            }
            set => Keywords { pattern: None, set },
        }
    }
}

impl Keywords {
    /// Keywords in the default category from a space-separated string
    pub fn words(words: &str) -> Self {
        KeywordSet::Words(words.to_string()).into()
    }

    /// Keywords in the default category from a list
    pub fn list<S: AsRef<str>>(words: &[S]) -> Self {
        KeywordSet::List(words.iter().map(|w| w.as_ref().to_string()).collect()).into()
    }

    /// An empty category map, filled with [`Keywords::category`]
    pub fn categories() -> Self {
        KeywordSet::Categories(BTreeMap::new()).into()
    }

    /// Builder: add space-separated `words` under `category`
    ///
    /// Turns a non-map keyword set into a map, keeping its words under the
    /// default category.
    pub fn category(mut self, category: &str, words: &str) -> Self {
        let mut categories = match self.set {
            KeywordSet::Categories(categories) => categories,
            other => {
                let mut categories = BTreeMap::new();
                categories.insert(DEFAULT_CATEGORY.to_string(), other);
                categories
            }
        };
        categories.insert(category.to_string(), KeywordSet::Words(words.to_string()));
        self.set = KeywordSet::Categories(categories);
        self
    }

    /// Builder: set the identifier pattern
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }
}

/// A normalized keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub category: String,
    pub relevance: u32,
}

impl KeywordEntry {
    /// Categories starting with `_` count towards relevance but are not
    /// highlighted
    pub fn is_hidden(&self) -> bool {
        self.category.starts_with('_')
    }
}

/// Flattened word → (category, relevance) lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: HashMap<String, KeywordEntry>,
}

impl KeywordTable {
    /// Normalize a keyword set; keys are lowercased for case-insensitive
    /// grammars
    pub fn new(set: &KeywordSet, case_insensitive: bool) -> Self {
        let mut table = Self::default();
        table.add_set(set, DEFAULT_CATEGORY, case_insensitive);
        table
    }

    fn add_set(&mut self, set: &KeywordSet, category: &str, case_insensitive: bool) {
        match set {
            KeywordSet::Words(words) => {
                for word in words.split_whitespace() {
                    self.add_word(word, category, case_insensitive);
                }
            }
            KeywordSet::List(words) => {
                for word in words {
                    self.add_word(word, category, case_insensitive);
                }
            }
            KeywordSet::Categories(categories) => {
                for (name, inner) in categories {
                    self.add_set(inner, name, case_insensitive);
                }
            }
        }
    }

    fn add_word(&mut self, raw: &str, category: &str, case_insensitive: bool) {
        let raw = if case_insensitive {
            raw.to_lowercase()
        } else {
            raw.to_string()
        };
        let (word, score) = match raw.split_once('|') {
            Some((word, score)) => (word, score.parse::<u32>().ok()),
            None => (raw.as_str(), None),
        };
        if word.is_empty() {
            return;
        }
        let relevance = score.unwrap_or_else(|| default_relevance(word));
        self.entries.insert(
            word.to_string(),
            KeywordEntry {
                category: category.to_string(),
                relevance,
            },
        );
    }

    /// Look up an already case-folded word
    pub fn get(&self, word: &str) -> Option<&KeywordEntry> {
        self.entries.get(word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_relevance(word: &str) -> u32 {
    let lower = word.to_lowercase();
    if COMMON_KEYWORDS.contains(&lower.as_str()) {
        0
    } else {
        1
    }
}
