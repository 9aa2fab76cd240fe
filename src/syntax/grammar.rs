//! Language grammars
//!
//! A grammar is a tree of modes. Each mode describes one lexical context
//! (a string, a comment, a function header...) by the pattern that enters
//! it, the pattern that leaves it, the keywords recognised inside it and
//! the child modes that may start inside it.
//!
//! Raw grammars are plain data: the compiler never mutates them. A mode may
//! be shared between several parents through an `Arc`, and recursion is
//! written with [`ModeRef::SelfRef`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Deserialize;

use super::compiler::{self, CompiledGrammar};
use super::hooks::{FrameData, MatchDecision, MatchHook, MatchInfo};
use super::keywords::Keywords;
use super::pattern::Pattern;
use crate::error::{HighlightError, Result};

/// Scope applied to the text of a begin or end match
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ScopeSpecDef")]
pub enum ScopeSpec {
    /// The whole lexeme gets one scope
    Wrap(String),
    /// Segment number (1-based) to scope, for array-valued begin/end
    Segments(BTreeMap<usize, String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeSpecDef {
    Wrap(String),
    Segments(BTreeMap<String, String>),
}

impl TryFrom<ScopeSpecDef> for ScopeSpec {
    type Error = String;

    fn try_from(def: ScopeSpecDef) -> std::result::Result<Self, Self::Error> {
        match def {
            ScopeSpecDef::Wrap(scope) => Ok(ScopeSpec::Wrap(scope)),
            ScopeSpecDef::Segments(map) => {
                let mut segments = BTreeMap::new();
                for (key, scope) in map {
                    let index = key
                        .parse::<usize>()
                        .map_err(|_| format!("segment scope key `{}` is not a number", key))?;
                    segments.insert(index, scope);
                }
                Ok(ScopeSpec::Segments(segments))
            }
        }
    }
}

impl ScopeSpec {
    /// Segment scopes from `(segment, scope)` pairs
    pub fn segments<S: Into<String>>(pairs: impl IntoIterator<Item = (usize, S)>) -> Self {
        ScopeSpec::Segments(pairs.into_iter().map(|(i, s)| (i, s.into())).collect())
    }
}

/// Language embedded inside a mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SubLanguage {
    /// Always this language
    Named(String),
    /// Best auto-detected candidate; empty means every registered language
    Candidates(Vec<String>),
}

/// A child entry in a mode's `contains` list
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ModeRefDef")]
pub enum ModeRef {
    Mode(Arc<Mode>),
    /// The containing mode itself
    SelfRef,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRefDef {
    Name(String),
    Mode(Box<Mode>),
}

impl TryFrom<ModeRefDef> for ModeRef {
    type Error = String;

    fn try_from(def: ModeRefDef) -> std::result::Result<Self, Self::Error> {
        match def {
            ModeRefDef::Name(name) if name == "self" => Ok(ModeRef::SelfRef),
            ModeRefDef::Name(name) => Err(format!("unknown mode reference `{}`", name)),
            ModeRefDef::Mode(mode) => Ok(ModeRef::Mode(Arc::new(*mode))),
        }
    }
}

impl From<Mode> for ModeRef {
    fn from(mode: Mode) -> Self {
        ModeRef::Mode(Arc::new(mode))
    }
}

impl From<Arc<Mode>> for ModeRef {
    fn from(mode: Arc<Mode>) -> Self {
        ModeRef::Mode(mode)
    }
}

impl From<&Arc<Mode>> for ModeRef {
    fn from(mode: &Arc<Mode>) -> Self {
        ModeRef::Mode(Arc::clone(mode))
    }
}

/// One lexical context of a grammar
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Mode {
    /// Scope wrapped around everything inside the mode
    pub scope: Option<String>,
    pub begin_scope: Option<ScopeSpec>,
    pub end_scope: Option<ScopeSpec>,
    pub begin: Option<Pattern>,
    pub end: Option<Pattern>,
    /// Shorthand for a `begin` with no `end`
    #[serde(rename = "match")]
    pub match_pattern: Option<Pattern>,
    /// Prefix that must precede `begin` without becoming part of this mode
    pub before_match: Option<Pattern>,
    /// Space-separated words that both start the mode and are its keywords
    pub begin_keywords: Option<String>,
    pub keywords: Option<Keywords>,
    pub illegal: Option<Pattern>,
    pub contains: Vec<ModeRef>,
    /// Alternative forms; each is this mode with the variant's fields laid
    /// over it
    pub variants: Vec<Mode>,
    /// Mode entered right after this one ends
    pub starts: Option<Arc<Mode>>,
    pub relevance: Option<u32>,
    pub skip: bool,
    pub exclude_begin: bool,
    pub exclude_end: bool,
    pub return_begin: bool,
    pub return_end: bool,
    pub ends_with_parent: bool,
    pub ends_parent: bool,
    pub sub_language: Option<SubLanguage>,
    #[serde(skip)]
    pub on_begin: Option<MatchHook>,
    #[serde(skip)]
    pub on_end: Option<MatchHook>,
}

impl Mode {
    /// Create an empty mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: scope
    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn begin(mut self, pattern: impl Into<Pattern>) -> Self {
        self.begin = Some(pattern.into());
        self
    }

    pub fn end(mut self, pattern: impl Into<Pattern>) -> Self {
        self.end = Some(pattern.into());
        self
    }

    /// Builder: single-pattern mode (the `match` shorthand)
    pub fn matching(mut self, pattern: impl Into<Pattern>) -> Self {
        self.match_pattern = Some(pattern.into());
        self
    }

    pub fn before_match(mut self, pattern: impl Into<Pattern>) -> Self {
        self.before_match = Some(pattern.into());
        self
    }

    pub fn begin_keywords(mut self, words: &str) -> Self {
        self.begin_keywords = Some(words.to_string());
        self
    }

    pub fn begin_scope(mut self, scope: ScopeSpec) -> Self {
        self.begin_scope = Some(scope);
        self
    }

    pub fn end_scope(mut self, scope: ScopeSpec) -> Self {
        self.end_scope = Some(scope);
        self
    }

    pub fn keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn illegal(mut self, pattern: impl Into<Pattern>) -> Self {
        self.illegal = Some(pattern.into());
        self
    }

    /// Builder: append a child mode
    pub fn child(mut self, child: impl Into<ModeRef>) -> Self {
        self.contains.push(child.into());
        self
    }

    /// Builder: append several child modes
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ModeRef>,
    {
        self.contains.extend(children.into_iter().map(Into::into));
        self
    }

    /// Builder: allow this mode to nest inside itself
    pub fn contains_self(mut self) -> Self {
        self.contains.push(ModeRef::SelfRef);
        self
    }

    pub fn variant(mut self, variant: Mode) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn starts(mut self, mode: Mode) -> Self {
        self.starts = Some(Arc::new(mode));
        self
    }

    pub fn relevance(mut self, relevance: u32) -> Self {
        self.relevance = Some(relevance);
        self
    }

    /// Builder: match the mode but emit its text into the parent unchanged
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn exclude_begin(mut self) -> Self {
        self.exclude_begin = true;
        self
    }

    pub fn exclude_end(mut self) -> Self {
        self.exclude_end = true;
        self
    }

    pub fn return_begin(mut self) -> Self {
        self.return_begin = true;
        self
    }

    pub fn return_end(mut self) -> Self {
        self.return_end = true;
        self
    }

    pub fn ends_with_parent(mut self) -> Self {
        self.ends_with_parent = true;
        self
    }

    pub fn ends_parent(mut self) -> Self {
        self.ends_parent = true;
        self
    }

    pub fn sub_language(mut self, language: &str) -> Self {
        self.sub_language = Some(SubLanguage::Named(language.to_string()));
        self
    }

    /// Builder: embed the best auto-detected language among `candidates`
    pub fn sub_language_candidates<S: AsRef<str>>(mut self, candidates: &[S]) -> Self {
        let names = candidates.iter().map(|c| c.as_ref().to_string()).collect();
        self.sub_language = Some(SubLanguage::Candidates(names));
        self
    }

    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MatchInfo<'_>, &mut FrameData) -> MatchDecision + Send + Sync + 'static,
    {
        self.on_begin = Some(MatchHook::new(hook));
        self
    }

    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MatchInfo<'_>, &mut FrameData) -> MatchDecision + Send + Sync + 'static,
    {
        self.on_end = Some(MatchHook::new(hook));
        self
    }

    /// Builder: the end match must capture the same text in group 1 as the
    /// begin match did
    pub fn end_same_as_begin(self) -> Self {
        const KEY: &str = "begin_match";
        self.on_begin(|info, data| {
            data.set(KEY, info.group(1).unwrap_or(""));
            MatchDecision::Accept
        })
        .on_end(|info, data| {
            if data.get(KEY) == Some(info.group(1).unwrap_or("")) {
                MatchDecision::Accept
            } else {
                MatchDecision::Ignore
            }
        })
    }

    /// Wrap in an `Arc` for sharing between parents
    pub fn shared(self) -> Arc<Mode> {
        Arc::new(self)
    }

    /// This mode laid under `variant`: every field the variant sets wins
    pub fn inherit(&self, variant: &Mode) -> Mode {
        Mode {
            scope: variant.scope.clone().or_else(|| self.scope.clone()),
            begin_scope: variant.begin_scope.clone().or_else(|| self.begin_scope.clone()),
            end_scope: variant.end_scope.clone().or_else(|| self.end_scope.clone()),
            begin: variant.begin.clone().or_else(|| self.begin.clone()),
            end: variant.end.clone().or_else(|| self.end.clone()),
            match_pattern: variant.match_pattern.clone().or_else(|| self.match_pattern.clone()),
            before_match: variant.before_match.clone().or_else(|| self.before_match.clone()),
            begin_keywords: variant.begin_keywords.clone().or_else(|| self.begin_keywords.clone()),
            keywords: variant.keywords.clone().or_else(|| self.keywords.clone()),
            illegal: variant.illegal.clone().or_else(|| self.illegal.clone()),
            contains: if variant.contains.is_empty() {
                self.contains.clone()
            } else {
                variant.contains.clone()
            },
            variants: Vec::new(),
            starts: variant.starts.clone().or_else(|| self.starts.clone()),
            relevance: variant.relevance.or(self.relevance),
            skip: variant.skip || self.skip,
            exclude_begin: variant.exclude_begin || self.exclude_begin,
            exclude_end: variant.exclude_end || self.exclude_end,
            return_begin: variant.return_begin || self.return_begin,
            return_end: variant.return_end || self.return_end,
            ends_with_parent: variant.ends_with_parent || self.ends_with_parent,
            ends_parent: variant.ends_parent || self.ends_parent,
            sub_language: variant.sub_language.clone().or_else(|| self.sub_language.clone()),
            on_begin: variant.on_begin.clone().or_else(|| self.on_begin.clone()),
            on_end: variant.on_end.clone().or_else(|| self.on_end.clone()),
        }
    }

    /// Whether compiling this mode depends on which parent it sits in
    pub(crate) fn depends_on_parent(&self) -> bool {
        self.ends_with_parent || self.starts.as_deref().map_or(false, Mode::depends_on_parent)
    }
}

/// A complete language definition
#[derive(Debug, Deserialize)]
pub struct Grammar {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Identifier pattern for modes whose keywords don't set one
    #[serde(default)]
    pub keyword_pattern: Option<String>,
    /// Scope name → scope emitted in its place
    #[serde(default)]
    pub class_name_aliases: HashMap<String, String>,
    /// Leave this grammar out of auto-detection
    #[serde(default)]
    pub disable_autodetect: bool,
    /// Language this one extends; wins relevance ties against it
    #[serde(default)]
    pub superset_of: Option<String>,
    #[serde(flatten)]
    pub root: Mode,
    #[serde(skip)]
    compiled: OnceCell<Arc<CompiledGrammar>>,
}

impl Grammar {
    /// Create a grammar from its top-level mode
    pub fn new(name: &str, root: Mode) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            case_insensitive: false,
            keyword_pattern: None,
            class_name_aliases: HashMap::new(),
            disable_autodetect: false,
            superset_of: None,
            root,
            compiled: OnceCell::new(),
        }
    }

    /// The grammar used in place of one that failed to load
    pub fn placeholder(name: &str) -> Self {
        let mut grammar = Grammar::new(name, Mode::new());
        grammar.disable_autodetect = true;
        grammar
    }

    /// Parse a grammar from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML grammar file
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let mut grammar = Self::from_toml_str(&source)?;
        if grammar.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                grammar.name = stem.to_string();
            }
        }
        Ok(grammar)
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn keyword_pattern(mut self, pattern: &str) -> Self {
        self.keyword_pattern = Some(pattern.to_string());
        self
    }

    pub fn class_name_alias(mut self, scope: &str, replacement: &str) -> Self {
        self.class_name_aliases
            .insert(scope.to_string(), replacement.to_string());
        self
    }

    pub fn disable_autodetect(mut self) -> Self {
        self.disable_autodetect = true;
        self
    }

    pub fn superset_of(mut self, language: &str) -> Self {
        self.superset_of = Some(language.to_string());
        self
    }

    /// The compiled form, built on first use and shared afterwards
    pub fn compiled(&self) -> Result<Arc<CompiledGrammar>> {
        let compiled = self
            .compiled
            .get_or_try_init(|| compiler::compile(self).map(Arc::new))?;
        Ok(Arc::clone(compiled))
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    pub(crate) fn configuration_error(&self, message: impl Into<String>) -> HighlightError {
        HighlightError::Configuration {
            language: self.name.clone(),
            message: message.into(),
        }
    }
}
