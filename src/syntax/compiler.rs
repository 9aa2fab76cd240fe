//! Grammar compilation
//!
//! Turns a [`Grammar`] into a flat arena of [`CompiledMode`]s addressed by
//! [`ModeId`]. Shorthands (`match`, `begin_keywords`, `before_match` and
//! variants) are expanded here, and every mode gets one matcher over its
//! children's begin patterns, its own terminator and its illegal pattern.
//!
//! The raw grammar is never modified. A raw mode shared between parents is
//! compiled once, unless its compiled form depends on the parent it sits in
//! (`ends_with_parent`), in which case it is compiled again for each parent.

use std::collections::HashMap;
use std::sync::Arc;

use fancy_regex::Regex;

use super::grammar::{Grammar, Mode, ModeRef, ScopeSpec, SubLanguage};
use super::hooks::{skip_after_dot, MatchHook};
use super::keywords::{KeywordTable, Keywords};
use super::matcher::{ResumableMultiRegex, Rule, RuleKind};
use super::pattern::{compile_regex, concat, count_groups, lookahead, Pattern};
use crate::error::Result;

/// Index of a mode in [`CompiledGrammar`]
pub type ModeId = usize;

/// Matches at the next word boundary or non-boundary, i.e. immediately
const BOUNDARY: &str = r"\B|\b";

/// Identifier pattern when neither the mode nor the grammar names one
const DEFAULT_KEYWORD_PATTERN: &str = r"\w+";

/// Label of modes without a scope in diagnostics
const UNNAMED: &str = "<unnamed>";

/// Scope applied to a begin or end match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledScope {
    Wrap(String),
    Segments(Vec<SegmentScope>),
}

/// One segment of an array-valued begin or end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentScope {
    /// Capture group holding the segment, relative to the rule
    pub group: usize,
    /// `None` leaves the segment to the surrounding mode's keywords
    pub scope: Option<String>,
}

#[derive(Debug)]
pub struct CompiledKeywords {
    pub table: KeywordTable,
    pub pattern: Regex,
}

/// A mode ready for scanning
#[derive(Debug)]
pub struct CompiledMode {
    pub label: String,
    pub scope: Option<String>,
    pub begin_scope: Option<CompiledScope>,
    pub end_scope: Option<CompiledScope>,
    /// Begin source as used in the parent's matcher; `None` for the root
    pub begin: Option<String>,
    /// Own end pattern, checked when a terminator matches
    pub end_re: Option<Regex>,
    /// Own end plus, for `ends_with_parent`, the parent's terminator
    pub terminator_end: Option<String>,
    pub illegal: Option<String>,
    pub keywords: Option<CompiledKeywords>,
    pub relevance: u32,
    pub skip: bool,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub sub_language: Option<SubLanguage>,
    pub before_begin: Option<MatchHook>,
    pub on_begin: Option<MatchHook>,
    pub on_end: Option<MatchHook>,
    pub contains: Vec<ModeId>,
    pub starts: Option<ModeId>,
    pub matcher: ResumableMultiRegex,
}

/// The executable form of a grammar
#[derive(Debug)]
pub struct CompiledGrammar {
    name: String,
    case_insensitive: bool,
    class_name_aliases: HashMap<String, String>,
    modes: Vec<CompiledMode>,
}

impl CompiledGrammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub(crate) fn root(&self) -> ModeId {
        0
    }

    pub(crate) fn mode(&self, id: ModeId) -> &CompiledMode {
        &self.modes[id]
    }

    /// Scope name after the grammar's alias table
    pub(crate) fn scope_name<'a>(&'a self, scope: &'a str) -> &'a str {
        self.class_name_aliases
            .get(scope)
            .map_or(scope, String::as_str)
    }
}

/// A raw mode with its shorthands expanded
struct Prepared {
    mode: Mode,
    before_begin: Option<MatchHook>,
}

struct Compiler<'g> {
    grammar: &'g Grammar,
    modes: Vec<CompiledMode>,
    /// Compiled id per shared raw mode
    cache: HashMap<*const Mode, ModeId>,
    /// Variant clones per raw mode
    variants: HashMap<*const Mode, Vec<Arc<Mode>>>,
    /// Keeps every mode used as a cache key alive until compilation ends
    retained: Vec<Arc<Mode>>,
}

/// Compile a grammar
pub(crate) fn compile(grammar: &Grammar) -> Result<CompiledGrammar> {
    let mut compiler = Compiler {
        grammar,
        modes: Vec::new(),
        cache: HashMap::new(),
        variants: HashMap::new(),
        retained: Vec::new(),
    };
    compiler.compile_mode(&grammar.root, None)?;
    log::debug!(
        "compiled grammar `{}` into {} modes",
        grammar.name,
        compiler.modes.len()
    );

    Ok(CompiledGrammar {
        name: grammar.name.clone(),
        case_insensitive: grammar.case_insensitive,
        class_name_aliases: grammar.class_name_aliases.clone(),
        modes: compiler.modes,
    })
}

impl<'g> Compiler<'g> {
    fn compile_mode(&mut self, raw: &Mode, parent: Option<ModeId>) -> Result<ModeId> {
        let Prepared { mode, before_begin } = self.prepare(raw, parent.is_some())?;
        let label = mode.scope.clone().unwrap_or_else(|| UNNAMED.to_string());
        let case_insensitive = self.grammar.case_insensitive;

        let begin_scope = self.compile_scope(mode.begin_scope.as_ref(), mode.begin.as_ref(), "begin")?;
        let end_scope = self.compile_scope(mode.end_scope.as_ref(), mode.end.as_ref(), "end")?;

        let (begin, end) = match parent {
            Some(_) => {
                let begin = mode
                    .begin
                    .as_ref()
                    .map_or_else(|| BOUNDARY.to_string(), Pattern::source);
                let end = match &mode.end {
                    Some(end) => Some(end.source()),
                    None if !mode.ends_with_parent => Some(BOUNDARY.to_string()),
                    None => None,
                };
                (Some(begin), end)
            }
            None => (None, None),
        };

        let end_re = match &end {
            Some(source) => Some(self.regex(source, &label)?),
            None => None,
        };

        let mut terminator_end = end.filter(|source| !source.is_empty());
        if mode.ends_with_parent {
            let inherited = parent.and_then(|p| self.modes[p].terminator_end.clone());
            if let Some(inherited) = inherited {
                terminator_end = Some(match terminator_end {
                    Some(own) => format!("{}|{}", own, inherited),
                    None => inherited,
                });
            }
        }

        let keywords = match &mode.keywords {
            Some(keywords) => Some(self.compile_keywords(keywords, &label)?),
            None => None,
        };

        let id = self.modes.len();
        self.modes.push(CompiledMode {
            label: label.clone(),
            scope: mode.scope.clone(),
            begin_scope,
            end_scope,
            begin,
            end_re,
            terminator_end,
            illegal: mode.illegal.as_ref().map(Pattern::source),
            keywords,
            relevance: mode.relevance.unwrap_or(1),
            skip: mode.skip,
            exclude_begin: mode.exclude_begin,
            exclude_end: mode.exclude_end,
            return_begin: mode.return_begin,
            return_end: mode.return_end,
            ends_with_parent: mode.ends_with_parent,
            ends_parent: mode.ends_parent,
            sub_language: mode.sub_language.clone(),
            before_begin,
            on_begin: mode.on_begin.clone(),
            on_end: mode.on_end.clone(),
            contains: Vec::new(),
            starts: None,
            matcher: ResumableMultiRegex::empty(),
        });

        let mut contains = Vec::new();
        for child in &mode.contains {
            match child {
                ModeRef::SelfRef if parent.is_none() => {
                    return Err(self
                        .grammar
                        .configuration_error("`self` is not supported in the top-level mode"));
                }
                ModeRef::SelfRef => contains.push(id),
                ModeRef::Mode(child) => {
                    for expanded in self.expand(child) {
                        contains.push(self.compile_child(&expanded, id)?);
                    }
                }
            }
        }

        let starts = match (&mode.starts, parent) {
            (Some(next), Some(parent)) => Some(self.compile_child(next, parent)?),
            (Some(_), None) => {
                return Err(self
                    .grammar
                    .configuration_error("the top-level mode cannot declare `starts`"));
            }
            (None, _) => None,
        };

        let mut rules: Vec<Rule> = contains
            .iter()
            .map(|&child| Rule {
                source: self.modes[child].begin.clone().unwrap_or_default(),
                kind: RuleKind::Begin(child),
            })
            .collect();
        if let Some(terminator) = &self.modes[id].terminator_end {
            rules.push(Rule {
                source: terminator.clone(),
                kind: RuleKind::End,
            });
        }
        if let Some(illegal) = &self.modes[id].illegal {
            rules.push(Rule {
                source: illegal.clone(),
                kind: RuleKind::Illegal,
            });
        }
        let matcher = ResumableMultiRegex::new(rules, case_insensitive).map_err(|err| {
            self.grammar
                .configuration_error(format!("invalid pattern in mode `{}`: {}", label, err))
        })?;

        let compiled = &mut self.modes[id];
        compiled.contains = contains;
        compiled.starts = starts;
        compiled.matcher = matcher;
        Ok(id)
    }

    /// Compile a child, reusing an earlier compilation of the same raw mode
    /// when the result cannot differ
    fn compile_child(&mut self, mode: &Arc<Mode>, parent: ModeId) -> Result<ModeId> {
        if mode.depends_on_parent() {
            return self.compile_mode(mode, Some(parent));
        }

        let key = Arc::as_ptr(mode);
        if let Some(&id) = self.cache.get(&key) {
            return Ok(id);
        }
        let id = self.compile_mode(mode, Some(parent))?;
        self.cache.insert(key, id);
        self.retained.push(Arc::clone(mode));
        Ok(id)
    }

    /// A mode's variants, or the mode itself when it has none
    fn expand(&mut self, mode: &Arc<Mode>) -> Vec<Arc<Mode>> {
        if mode.variants.is_empty() {
            return vec![Arc::clone(mode)];
        }

        let key = Arc::as_ptr(mode);
        if let Some(variants) = self.variants.get(&key) {
            return variants.clone();
        }
        let variants: Vec<Arc<Mode>> = mode
            .variants
            .iter()
            .map(|variant| Arc::new(mode.inherit(variant)))
            .collect();
        self.variants.insert(key, variants.clone());
        self.retained.push(Arc::clone(mode));
        variants
    }

    /// Expand the shorthands of a raw mode into a plain mode
    fn prepare(&self, raw: &Mode, has_parent: bool) -> Result<Prepared> {
        let mut mode = raw.clone();
        let mut before_begin = None;

        if let Some(pattern) = mode.match_pattern.take() {
            if mode.begin.is_some() || mode.end.is_some() {
                return Err(self
                    .grammar
                    .configuration_error("`match` cannot be combined with `begin` or `end`"));
            }
            mode.begin = Some(pattern);
        }

        if mode.begin.as_ref().map_or(false, Pattern::is_segments)
            && (mode.skip || mode.exclude_begin || mode.return_begin)
        {
            return Err(self.grammar.configuration_error(
                "`skip`, `exclude_begin` and `return_begin` cannot be used with an array `begin`",
            ));
        }
        if mode.end.as_ref().map_or(false, Pattern::is_segments)
            && (mode.skip || mode.exclude_end || mode.return_end)
        {
            return Err(self.grammar.configuration_error(
                "`skip`, `exclude_end` and `return_end` cannot be used with an array `end`",
            ));
        }

        if let Some(before) = mode.before_match.take() {
            if mode.starts.is_some() {
                return Err(self
                    .grammar
                    .configuration_error("`before_match` cannot be combined with `starts`"));
            }
            let begin = mode
                .begin
                .as_ref()
                .map_or_else(|| BOUNDARY.to_string(), Pattern::source);
            let keywords = mode.keywords.clone();
            let original = Mode {
                ends_parent: true,
                ..mode
            };
            // The prefix is matched by a bare outer mode; the real mode is
            // entered as its continuation and closes it again
            mode = Mode {
                keywords,
                begin: Some(Pattern::Regex(concat(&[before.source(), lookahead(&begin)]))),
                relevance: Some(0),
                starts: Some(Arc::new(Mode {
                    relevance: Some(0),
                    contains: vec![ModeRef::from(original)],
                    ..Mode::default()
                })),
                ..Mode::default()
            };
        }

        if has_parent {
            if let Some(words) = mode.begin_keywords.take() {
                let words: Vec<&str> = words.split_whitespace().collect();
                mode.begin = Some(Pattern::Regex(format!(
                    r"\b({})(?!\.)(?=\b|\s)",
                    words.join("|")
                )));
                if mode.keywords.is_none() {
                    mode.keywords = Some(Keywords::list(&words));
                }
                mode.relevance = mode.relevance.or(Some(0));
                before_begin = Some(skip_after_dot());
            }
        }

        Ok(Prepared { mode, before_begin })
    }

    fn compile_scope(
        &self,
        spec: Option<&ScopeSpec>,
        pattern: Option<&Pattern>,
        which: &str,
    ) -> Result<Option<CompiledScope>> {
        let parts = match pattern {
            Some(Pattern::Segments(parts)) => Some(parts),
            _ => None,
        };

        match (spec, parts) {
            (None, None) => Ok(None),
            (None, Some(_)) | (Some(ScopeSpec::Wrap(_)), Some(_)) => {
                Err(self.grammar.configuration_error(format!(
                    "an array `{0}` needs a segment map in `{0}_scope`",
                    which
                )))
            }
            (Some(ScopeSpec::Wrap(scope)), None) => Ok(Some(CompiledScope::Wrap(scope.clone()))),
            (Some(ScopeSpec::Segments(_)), None) => Err(self.grammar.configuration_error(format!(
                "a segment map in `{0}_scope` needs an array `{0}`",
                which
            ))),
            (Some(ScopeSpec::Segments(map)), Some(parts)) => {
                let mut offset = 0;
                let mut segments = Vec::with_capacity(parts.len());
                for (i, part) in parts.iter().enumerate() {
                    let number = i + 1;
                    segments.push(SegmentScope {
                        group: number + offset,
                        scope: map.get(&number).cloned(),
                    });
                    offset += count_groups(&part.source());
                }
                Ok(Some(CompiledScope::Segments(segments)))
            }
        }
    }

    fn compile_keywords(&self, keywords: &Keywords, label: &str) -> Result<CompiledKeywords> {
        let pattern = keywords
            .pattern
            .as_deref()
            .or(self.grammar.keyword_pattern.as_deref())
            .unwrap_or(DEFAULT_KEYWORD_PATTERN);
        Ok(CompiledKeywords {
            table: KeywordTable::new(&keywords.set, self.grammar.case_insensitive),
            pattern: self.regex(pattern, label)?,
        })
    }

    fn regex(&self, source: &str, label: &str) -> Result<Regex> {
        compile_regex(source, self.grammar.case_insensitive).map_err(|err| {
            self.grammar
                .configuration_error(format!("invalid pattern in mode `{}`: {}", label, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HighlightError;

    fn child_of(compiled: &CompiledGrammar, parent: ModeId, n: usize) -> &CompiledMode {
        compiled.mode(compiled.mode(parent).contains[n])
    }

    fn is_configuration_error(result: Result<Arc<CompiledGrammar>>) -> bool {
        matches!(result, Err(HighlightError::Configuration { .. }))
    }

    #[test]
    fn test_root_defaults() {
        let grammar = Grammar::new("t", Mode::new().child(Mode::new().scope("string").begin("\"").end("\"")));
        let compiled = grammar.compiled().unwrap();
        let root = compiled.mode(compiled.root());
        assert!(root.begin.is_none());
        assert!(root.terminator_end.is_none());
        assert_eq!(root.matcher.rule_count(), 1);

        let string = child_of(&compiled, 0, 0);
        assert_eq!(string.begin.as_deref(), Some("\""));
        assert_eq!(string.relevance, 1);
        assert_eq!(string.label, "string");
    }

    #[test]
    fn test_missing_begin_end_match_immediately() {
        let grammar = Grammar::new("t", Mode::new().child(Mode::new().scope("x")));
        let compiled = grammar.compiled().unwrap();
        let child = child_of(&compiled, 0, 0);
        assert_eq!(child.begin.as_deref(), Some(BOUNDARY));
        assert_eq!(child.terminator_end.as_deref(), Some(BOUNDARY));
    }

    #[test]
    fn test_match_with_begin_is_rejected() {
        let grammar = Grammar::new("t", Mode::new().child(Mode::new().matching("a").begin("b")));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_match_becomes_begin() {
        let grammar = Grammar::new("t", Mode::new().child(Mode::new().matching(r"\d+")));
        let compiled = grammar.compiled().unwrap();
        assert_eq!(child_of(&compiled, 0, 0).begin.as_deref(), Some(r"\d+"));
    }

    #[test]
    fn test_self_at_top_level_is_rejected() {
        let grammar = Grammar::new("t", Mode::new().contains_self());
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_self_reference_points_at_mode() {
        let grammar = Grammar::new(
            "t",
            Mode::new().child(Mode::new().begin(r"\(").end(r"\)").contains_self()),
        );
        let compiled = grammar.compiled().unwrap();
        let paren = compiled.mode(0).contains[0];
        assert_eq!(compiled.mode(paren).contains, vec![paren]);
    }

    #[test]
    fn test_segments_with_skip_are_rejected() {
        let mode = Mode::new()
            .begin(Pattern::segments(["a", "b"]))
            .begin_scope(ScopeSpec::segments([(1, "x")]))
            .skip();
        let grammar = Grammar::new("t", Mode::new().child(mode));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_segment_map_needs_array() {
        let mode = Mode::new()
            .begin("ab")
            .begin_scope(ScopeSpec::segments([(1, "x")]));
        let grammar = Grammar::new("t", Mode::new().child(mode));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_segment_groups_skip_inner_groups() {
        let mode = Mode::new()
            .begin(Pattern::segments([r"(a)b", r"\s+", "c"]))
            .begin_scope(ScopeSpec::segments([(1, "keyword"), (3, "title")]));
        let grammar = Grammar::new("t", Mode::new().child(mode));
        let compiled = grammar.compiled().unwrap();
        let child = child_of(&compiled, 0, 0);
        assert_eq!(
            child.begin_scope,
            Some(CompiledScope::Segments(vec![
                SegmentScope { group: 1, scope: Some("keyword".into()) },
                SegmentScope { group: 3, scope: None },
                SegmentScope { group: 4, scope: Some("title".into()) },
            ]))
        );
    }

    #[test]
    fn test_before_match_with_starts_is_rejected() {
        let mode = Mode::new().before_match("x").begin("y").starts(Mode::new());
        let grammar = Grammar::new("t", Mode::new().child(mode));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_before_match_rewrite() {
        let mode = Mode::new().scope("title").before_match(r"fn\s+").begin(r"\w+");
        let grammar = Grammar::new("t", Mode::new().child(mode));
        let compiled = grammar.compiled().unwrap();

        let outer = child_of(&compiled, 0, 0);
        assert_eq!(outer.begin.as_deref(), Some(r"fn\s+(?=\w+)"));
        assert_eq!(outer.relevance, 0);
        assert!(outer.scope.is_none());

        let next = compiled.mode(outer.starts.unwrap());
        assert_eq!(next.relevance, 0);
        let inner = compiled.mode(next.contains[0]);
        assert_eq!(inner.scope.as_deref(), Some("title"));
        assert!(inner.ends_parent);
    }

    #[test]
    fn test_begin_keywords() {
        let mode = Mode::new().scope("class").begin_keywords("class struct");
        let grammar = Grammar::new("t", Mode::new().child(mode));
        let compiled = grammar.compiled().unwrap();
        let child = child_of(&compiled, 0, 0);
        assert_eq!(child.begin.as_deref(), Some(r"\b(class|struct)(?!\.)(?=\b|\s)"));
        assert_eq!(child.relevance, 0);
        assert!(child.before_begin.is_some());
        let keywords = child.keywords.as_ref().unwrap();
        assert!(keywords.table.get("struct").is_some());
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let grammar = Grammar::new("t", Mode::new().child(Mode::new().begin("(unclosed")));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_shared_mode_compiled_once() {
        let string = Mode::new().scope("string").begin("'").end("'").shared();
        let root = Mode::new()
            .child(Mode::new().begin(r"\{").end(r"\}").child(&string))
            .child(Mode::new().begin(r"\[").end(r"\]").child(&string));
        let compiled = Grammar::new("t", root).compiled().unwrap();
        let first = compiled.mode(compiled.mode(0).contains[0]).contains[0];
        let second = compiled.mode(compiled.mode(0).contains[1]).contains[0];
        assert_eq!(first, second);
    }

    #[test]
    fn test_parent_dependent_mode_compiled_per_parent() {
        let value = Mode::new().scope("value").begin("=").ends_with_parent().shared();
        let root = Mode::new()
            .child(Mode::new().begin("a").end(";").child(&value))
            .child(Mode::new().begin("b").end("!").child(&value));
        let compiled = Grammar::new("t", root).compiled().unwrap();
        let first = compiled.mode(compiled.mode(0).contains[0]).contains[0];
        let second = compiled.mode(compiled.mode(0).contains[1]).contains[0];
        assert_ne!(first, second);
        assert_eq!(compiled.mode(first).terminator_end.as_deref(), Some(";"));
        assert_eq!(compiled.mode(second).terminator_end.as_deref(), Some("!"));
    }

    #[test]
    fn test_variants_expand_in_place() {
        let number = Mode::new()
            .scope("number")
            .variant(Mode::new().begin(r"0x[0-9a-f]+"))
            .variant(Mode::new().begin(r"\d+"));
        let root = Mode::new().child(Mode::new().begin("'").end("'")).child(number);
        let compiled = Grammar::new("t", root).compiled().unwrap();
        assert_eq!(compiled.mode(0).contains.len(), 3);
        let hex = child_of(&compiled, 0, 1);
        let dec = child_of(&compiled, 0, 2);
        assert_eq!(hex.scope.as_deref(), Some("number"));
        assert_eq!(hex.begin.as_deref(), Some(r"0x[0-9a-f]+"));
        assert_eq!(dec.begin.as_deref(), Some(r"\d+"));
    }

    #[test]
    fn test_top_level_starts_is_rejected() {
        let grammar = Grammar::new("t", Mode::new().starts(Mode::new()));
        assert!(is_configuration_error(grammar.compiled()));
    }

    #[test]
    fn test_scope_name_aliases() {
        let grammar = Grammar::new("t", Mode::new()).class_name_alias("built_in", "builtin");
        let compiled = grammar.compiled().unwrap();
        assert_eq!(compiled.scope_name("built_in"), "builtin");
        assert_eq!(compiled.scope_name("string"), "string");
    }
}
