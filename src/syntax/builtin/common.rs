//! Modes shared by the built-in grammars

use std::sync::Arc;

use crate::syntax::{MatchDecision, Mode, ModeRef};

pub const IDENT_RE: &str = r"[a-zA-Z]\w*";
pub const UNDERSCORE_IDENT_RE: &str = r"[a-zA-Z_]\w*";
pub const NUMBER_RE: &str = r"\b\d+(\.\d+)?";
pub const C_NUMBER_RE: &str =
    r"(-?)(\b0[xX][a-fA-F0-9]+|(\b\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?)";
pub const BINARY_NUMBER_RE: &str = r"\b(0b[01]+)";

/// A backslash and whatever character follows it
pub fn backslash_escape() -> Arc<Mode> {
    Mode::new().begin(r"\\[\s\S]").relevance(0).shared()
}

pub fn apos_string() -> Arc<Mode> {
    string_between("'")
}

pub fn quote_string() -> Arc<Mode> {
    string_between("\"")
}

fn string_between(quote: &str) -> Arc<Mode> {
    Mode::new()
        .scope("string")
        .begin(quote)
        .end(quote)
        .illegal(r"\n")
        .child(backslash_escape())
        .shared()
}

/// A comment from `begin` to `end`, with `TODO:`-style markers scoped as
/// doctags
pub fn comment(begin: &str, end: &str) -> Mode {
    let doctag = Mode::new()
        .scope("doctag")
        .begin(r"[ ]*(?=(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):)")
        .end(r"(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):")
        .exclude_begin()
        .relevance(0);
    Mode::new()
        .scope("comment")
        .begin(begin)
        .end(end)
        .child(doctag)
}

pub fn c_line_comment() -> Arc<Mode> {
    comment("//", "$").shared()
}

pub fn c_block_comment() -> Arc<Mode> {
    comment(r"/\*", r"\*/").shared()
}

pub fn hash_comment() -> Arc<Mode> {
    comment("#", "$").shared()
}

pub fn number() -> Arc<Mode> {
    Mode::new().scope("number").begin(NUMBER_RE).relevance(0).shared()
}

pub fn c_number() -> Arc<Mode> {
    Mode::new().scope("number").begin(C_NUMBER_RE).relevance(0).shared()
}

pub fn binary_number() -> Arc<Mode> {
    Mode::new()
        .scope("number")
        .begin(BINARY_NUMBER_RE)
        .relevance(0)
        .shared()
}

pub fn title() -> Arc<Mode> {
    Mode::new().scope("title").begin(IDENT_RE).relevance(0).shared()
}

pub fn underscore_title() -> Arc<Mode> {
    Mode::new()
        .scope("title")
        .begin(UNDERSCORE_IDENT_RE)
        .relevance(0)
        .shared()
}

/// `#!` interpreter line, only at the very start of the input
pub fn shebang() -> Arc<Mode> {
    Mode::new()
        .scope("meta")
        .begin(r"^#![ ]*/.*\b")
        .end("$")
        .relevance(0)
        .on_begin(|info, _| {
            if info.index() == 0 {
                MatchDecision::Accept
            } else {
                MatchDecision::Ignore
            }
        })
        .shared()
}

/// Shorthand for a list of shared modes as children
pub fn modes(list: &[&Arc<Mode>]) -> Vec<ModeRef> {
    list.iter().map(|mode| ModeRef::from(*mode)).collect()
}
