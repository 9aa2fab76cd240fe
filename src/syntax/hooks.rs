//! Match hooks and highlight plugins
//!
//! A mode may carry hooks that run when its begin or end pattern matches.
//! Each hook inspects the match and answers [`MatchDecision::Accept`] or
//! [`MatchDecision::Ignore`]; an ignored match is treated as if the pattern
//! had not matched there. Plugins wrap a whole highlight call.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::result::HighlightResult;

/// Answer of a match hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    Accept,
    Ignore,
}

/// The match a hook is asked about
#[derive(Debug, Clone)]
pub struct MatchInfo<'t> {
    input: &'t str,
    index: usize,
    /// Group 0 is the whole match, then the rule's own capture groups
    groups: Vec<Option<Range<usize>>>,
}

impl<'t> MatchInfo<'t> {
    pub(crate) fn new(input: &'t str, index: usize, groups: Vec<Option<Range<usize>>>) -> Self {
        Self {
            input,
            index,
            groups,
        }
    }

    /// The complete text being highlighted
    pub fn input(&self) -> &'t str {
        self.input
    }

    /// Byte offset of the match in the input
    pub fn index(&self) -> usize {
        self.index
    }

    /// The matched text
    pub fn lexeme(&self) -> &'t str {
        self.group(0).unwrap_or("")
    }

    /// Text of capture group `n` of the rule, if it participated
    pub fn group(&self, n: usize) -> Option<&'t str> {
        let range = self.groups.get(n)?.clone()?;
        self.input.get(range)
    }

    /// The character just before the match
    pub fn preceding_char(&self) -> Option<char> {
        self.input[..self.index].chars().next_back()
    }
}

/// Per-frame scratch space shared by a mode's begin and end hooks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameData {
    values: HashMap<String, String>,
}

impl FrameData {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

type HookFn = dyn Fn(&MatchInfo<'_>, &mut FrameData) -> MatchDecision + Send + Sync;

/// A begin or end hook
#[derive(Clone)]
pub struct MatchHook(Arc<HookFn>);

impl MatchHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&MatchInfo<'_>, &mut FrameData) -> MatchDecision + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub(crate) fn call(&self, info: &MatchInfo<'_>, data: &mut FrameData) -> MatchDecision {
        (self.0)(info, data)
    }
}

impl fmt::Debug for MatchHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MatchHook(..)")
    }
}

/// Ignores begin matches that directly follow a `.`, so `obj.if` is not
/// taken for the keyword `if`
pub(crate) fn skip_after_dot() -> MatchHook {
    MatchHook::new(|info, _| {
        if info.preceding_char() == Some('.') {
            MatchDecision::Ignore
        } else {
            MatchDecision::Accept
        }
    })
}

/// Input of a highlight call as seen by plugins
#[derive(Debug, Clone)]
pub struct BeforeHighlight {
    pub code: String,
    pub language: String,
    /// Set by a plugin to skip highlighting and return this instead
    pub result: Option<HighlightResult>,
}

/// Pre/post-processing around every [`Registry::highlight`] call
///
/// [`Registry::highlight`]: super::registry::Registry::highlight
pub trait Plugin: Send + Sync {
    fn before_highlight(&self, _context: &mut BeforeHighlight) {}

    fn after_highlight(&self, _result: &mut HighlightResult) {}
}
