//! Multi-pattern matching
//!
//! Every mode looks for the same kinds of things at once: the begin pattern
//! of each child, its own terminator, and its illegal pattern. Those rules
//! are joined into one alternation, each alternative wrapped in a capture
//! group, and a table maps the wrapping group back to the rule.

use std::ops::Range;

use fancy_regex::Regex;
use once_cell::sync::OnceCell;

use super::compiler::ModeId;
use super::pattern::{compile_regex, count_groups, join_with_groups};

/// What a matched alternative stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Begin pattern of a child mode
    Begin(ModeId),
    /// Terminator of the current mode (or an ancestor it ends with)
    End,
    Illegal,
}

/// A rule as fed to the matcher
#[derive(Debug, Clone)]
pub struct Rule {
    pub source: String,
    pub kind: RuleKind,
}

/// One successful match
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Byte offset of the match
    pub index: usize,
    /// Group 0 is the whole match, then the matched rule's own groups
    pub groups: Vec<Option<Range<usize>>>,
    pub kind: RuleKind,
    /// Position of the rule in the matcher it came from
    position: usize,
}

impl MatchResult {
    pub fn lexeme<'t>(&self, text: &'t str) -> &'t str {
        self.groups
            .first()
            .cloned()
            .flatten()
            .and_then(|range| text.get(range))
            .unwrap_or("")
    }
}

/// All rules joined into one regex
#[derive(Debug)]
struct MultiRegex {
    regex: Option<Regex>,
    /// (wrapping group, rule kind, position), ordered by group
    match_indexes: Vec<(usize, RuleKind, usize)>,
}

impl MultiRegex {
    fn build(rules: &[Rule], case_insensitive: bool) -> Result<Self, fancy_regex::Error> {
        if rules.is_empty() {
            return Ok(Self {
                regex: None,
                match_indexes: Vec::new(),
            });
        }

        let mut match_at = 1;
        let mut match_indexes = Vec::with_capacity(rules.len());
        for (position, rule) in rules.iter().enumerate() {
            match_indexes.push((match_at, rule.kind, position));
            match_at += count_groups(&rule.source) + 1;
        }

        let sources: Vec<&str> = rules.iter().map(|r| r.source.as_str()).collect();
        let regex = compile_regex(&join_with_groups(&sources, "|"), case_insensitive)?;
        Ok(Self {
            regex: Some(regex),
            match_indexes,
        })
    }

    fn exec(&self, text: &str, last_index: usize) -> Result<Option<MatchResult>, fancy_regex::Error> {
        let Some(regex) = &self.regex else {
            return Ok(None);
        };
        let Some(caps) = regex.captures_from_pos(text, last_index)? else {
            return Ok(None);
        };

        // The first participating wrapper is the alternative that matched
        let Some(&(group, kind, position)) = self
            .match_indexes
            .iter()
            .find(|(group, _, _)| caps.get(*group).is_some())
        else {
            return Ok(None);
        };

        let index = caps.get(group).map_or(last_index, |m| m.start());
        let groups = (group..caps.len())
            .map(|i| caps.get(i).map(|m| m.start()..m.end()))
            .collect();
        Ok(Some(MatchResult {
            index,
            groups,
            kind,
            position,
        }))
    }
}

/// Matcher that can resume after an ignored match
///
/// When a hook ignores a begin match, the scan retries at the same offset
/// with only the rules after the ignored one. Matchers for those suffixes
/// of the rule list are built on demand and cached.
#[derive(Debug)]
pub struct ResumableMultiRegex {
    rules: Vec<Rule>,
    case_insensitive: bool,
    matchers: Vec<OnceCell<MultiRegex>>,
}

impl ResumableMultiRegex {
    /// Build the matcher, compiling the full rule set straight away so a
    /// bad pattern is reported at compile time
    pub fn new(rules: Vec<Rule>, case_insensitive: bool) -> Result<Self, fancy_regex::Error> {
        let matchers = (0..rules.len().max(1)).map(|_| OnceCell::new()).collect();
        let matcher = Self {
            rules,
            case_insensitive,
            matchers,
        };
        matcher.matcher(0)?;
        Ok(matcher)
    }

    /// A matcher with no rules; never matches
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            case_insensitive: false,
            matchers: vec![OnceCell::with_value(MultiRegex {
                regex: None,
                match_indexes: Vec::new(),
            })],
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn matcher(&self, start: usize) -> Result<&MultiRegex, fancy_regex::Error> {
        let start = start.min(self.matchers.len() - 1);
        self.matchers[start].get_or_try_init(|| {
            let rules = self.rules.get(start..).unwrap_or(&[]);
            MultiRegex::build(rules, self.case_insensitive)
        })
    }

    /// Find the next match at or after `last_index`
    ///
    /// `cursor` is the index of the first rule to try. A non-zero cursor
    /// means the previous match at this offset was ignored: the remaining
    /// rules are tried at the same offset, and if none of them matches
    /// there the full rule set is tried from the next character.
    pub fn exec(
        &self,
        text: &str,
        last_index: usize,
        cursor: &mut usize,
    ) -> Result<Option<MatchResult>, fancy_regex::Error> {
        let mut base = *cursor;
        let mut result = self.matcher(base)?.exec(text, last_index)?;

        if base != 0 && !matches!(&result, Some(m) if m.index == last_index) {
            base = 0;
            result = match next_char_boundary(text, last_index) {
                Some(next) => self.matcher(0)?.exec(text, next)?,
                None => None,
            };
        }

        if let Some(found) = &result {
            *cursor = base + found.position + 1;
            if *cursor >= self.rules.len() {
                *cursor = 0;
            }
        }
        Ok(result)
    }
}

/// Offset of the character after the one at `index`
fn next_char_boundary(text: &str, index: usize) -> Option<usize> {
    text.get(index..)?
        .chars()
        .next()
        .map(|c| index + c.len_utf8())
}
