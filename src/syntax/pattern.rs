//! Regex sources for grammar patterns
//!
//! Grammar authors write begin/end/illegal matchers as regex source text.
//! This module holds the `Pattern` type, the combinators used to build
//! sources, and the capture-group bookkeeping the compiler needs when it
//! joins independently written patterns into a single alternation.

use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Tokens of a regex source that matter for group numbering: a whole
/// character class, a group opener, a numeric backreference, or any other
/// escaped character.
static SOURCE_TOKEN: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"\[(?:[^\\\]]|\\.)*\]|\(\?P?<[A-Za-z_]|\(\??|\\([1-9][0-9]*)|\\.")
        .expect("source tokenizer pattern is valid")
});

/// A matcher as written in a grammar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PatternDef")]
pub enum Pattern {
    /// Regex source text
    Regex(String),
    /// Text matched verbatim
    Literal(String),
    /// Adjacent segments, each captured in its own group
    Segments(Vec<Pattern>),
    /// Any one of several alternatives
    Either(Vec<Pattern>),
}

/// On-disk shape of a pattern in a TOML grammar
#[derive(Deserialize)]
#[serde(untagged)]
enum PatternDef {
    Regex(String),
    Segments(Vec<Pattern>),
    Literal { literal: String },
    Either { either: Vec<Pattern> },
}

impl From<PatternDef> for Pattern {
    fn from(def: PatternDef) -> Self {
        match def {
            PatternDef::Regex(source) => Pattern::Regex(source),
            PatternDef::Segments(parts) => Pattern::Segments(parts),
            PatternDef::Literal { literal } => Pattern::Literal(literal),
            PatternDef::Either { either } => Pattern::Either(either),
        }
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::Regex(source.to_string())
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::Regex(source)
    }
}

impl Pattern {
    /// A pattern matching `text` exactly
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// A pattern matching any of `alternatives`
    pub fn either<P: Into<Pattern>>(alternatives: impl IntoIterator<Item = P>) -> Self {
        Pattern::Either(alternatives.into_iter().map(Into::into).collect())
    }

    /// Segments that are scoped one by one through a segment scope table
    pub fn segments<P: Into<Pattern>>(parts: impl IntoIterator<Item = P>) -> Self {
        Pattern::Segments(parts.into_iter().map(Into::into).collect())
    }

    pub fn is_segments(&self) -> bool {
        matches!(self, Pattern::Segments(_))
    }

    /// Regex source for this pattern
    ///
    /// Segments are joined with each segment in its own capture group and
    /// their backreferences renumbered, the same way the compiler joins
    /// them for segment-scoped begin/end matchers.
    pub fn source(&self) -> String {
        match self {
            Pattern::Regex(source) => source.clone(),
            Pattern::Literal(text) => escape(text),
            Pattern::Segments(parts) => {
                let sources: Vec<String> = parts.iter().map(Pattern::source).collect();
                join_with_groups(&sources, "")
            }
            Pattern::Either(parts) => {
                let sources: Vec<String> = parts.iter().map(Pattern::source).collect();
                either(&sources)
            }
        }
    }
}

/// Escape regex metacharacters so `text` matches literally
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Concatenate sources in order
pub fn concat<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(AsRef::as_ref).collect()
}

/// Zero-width positive lookahead
pub fn lookahead(source: &str) -> String {
    format!("(?={})", source)
}

/// Non-capturing alternation
pub fn either<S: AsRef<str>>(alternatives: &[S]) -> String {
    let joined: Vec<&str> = alternatives.iter().map(AsRef::as_ref).collect();
    format!("(?:{})", joined.join("|"))
}

/// `source` zero or one time
pub fn optional(source: &str) -> String {
    format!("(?:{})?", source)
}

/// `source` zero or more times
pub fn any_number_of_times(source: &str) -> String {
    format!("(?:{})*", source)
}

/// Number of capturing groups in a regex source
///
/// Character classes and escaped characters are skipped, so `[(]` and `\(`
/// do not count. Named groups count; lookarounds and `(?:` do not.
pub fn count_groups(source: &str) -> usize {
    SOURCE_TOKEN
        .find_iter(source)
        .filter(|m| {
            let token = m.as_str();
            token == "(" || token.starts_with("(?<") || token.starts_with("(?P<")
        })
        .count()
}

/// Join sources, wrapping each in its own capture group
///
/// Every numeric backreference inside a source is shifted by the number of
/// groups that precede that source in the joined result, so each
/// backreference still points at the group its author meant.
pub fn join_with_groups<S: AsRef<str>>(sources: &[S], separator: &str) -> String {
    let mut groups = 0usize;
    let mut wrapped = Vec::with_capacity(sources.len());

    for source in sources {
        // The wrapping group
        groups += 1;
        let offset = groups;

        let mut rest = source.as_ref();
        let mut out = String::with_capacity(rest.len() + 2);
        while let Some(caps) = SOURCE_TOKEN.captures(rest) {
            let (token, backref) = match (caps.get(0), caps.get(1)) {
                (Some(token), backref) => (token, backref),
                (None, _) => break,
            };
            out.push_str(&rest[..token.start()]);

            match backref.and_then(|n| n.as_str().parse::<usize>().ok()) {
                Some(number) => {
                    out.push('\\');
                    out.push_str(&(number + offset).to_string());
                }
                None => {
                    let text = token.as_str();
                    out.push_str(text);
                    if text == "(" || text.starts_with("(?<") || text.starts_with("(?P<") {
                        groups += 1;
                    }
                }
            }
            rest = &rest[token.end()..];
        }
        out.push_str(rest);
        wrapped.push(format!("({})", out));
    }

    wrapped.join(separator)
}

/// Compile a grammar regex
///
/// Grammar patterns are always multi-line (`^`/`$` match at line breaks)
/// and honour the grammar's case-sensitivity.
pub fn compile_regex(source: &str, case_insensitive: bool) -> Result<Regex, fancy_regex::Error> {
    let flags = if case_insensitive { "(?i)(?m)" } else { "(?m)" };
    Regex::new(&format!("{}{}", flags, source))
}
