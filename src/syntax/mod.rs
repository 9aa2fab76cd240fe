//! Syntax highlighting engine
//!
//! This module provides the highlighting pipeline:
//! - Grammars: trees of modes with begin/end patterns and keywords
//! - Compilation of grammars into per-mode multi-pattern matchers
//! - The scan loop that turns source text into a token tree
//! - HTML rendering, auto-detection and the language registry

mod builtin;
mod compiler;
mod emitter;
mod grammar;
mod hooks;
mod keywords;
mod matcher;
mod pattern;
mod registry;
mod result;
mod scanner;
mod scope;

pub use builtin::common;
pub use compiler::{CompiledGrammar, ModeId};
pub use emitter::{Node, Token, TokenTree};
pub use grammar::{Grammar, Mode, ModeRef, ScopeSpec, SubLanguage};
pub use hooks::{BeforeHighlight, FrameData, MatchDecision, MatchHook, MatchInfo, Plugin};
pub use keywords::{KeywordEntry, KeywordSet, KeywordTable, Keywords, DEFAULT_CATEGORY};
pub use pattern::{
    any_number_of_times, concat, count_groups, either, escape, lookahead, optional, Pattern,
};
pub use registry::Registry;
pub use result::{HighlightOptions, HighlightResult, IllegalContext};
pub use scope::{css_class, escape_html, unescape_html};
