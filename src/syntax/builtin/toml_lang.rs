//! TOML language definition

use crate::syntax::builtin::common::{self, modes};
use crate::syntax::{Grammar, Keywords, Mode, ModeRef};

/// Create TOML language definition
pub fn toml_grammar() -> Grammar {
    let comment = common::hash_comment();
    let literals = || Keywords::categories().category("literal", "true false inf nan");

    let string = Mode::new()
        .scope("string")
        .variant(Mode::new().begin(r#"""""#).end(r#"""""#).child(common::backslash_escape()))
        .variant(Mode::new().begin(r"'''").end(r"'''"))
        .variant(
            Mode::new()
                .begin("\"")
                .end("\"")
                .illegal(r"\n")
                .child(common::backslash_escape()),
        )
        .variant(Mode::new().begin("'").end("'").illegal(r"\n"))
        .shared();

    let number = Mode::new()
        .scope("number")
        .relevance(0)
        .variant(Mode::new().begin(
            r"\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?)?",
        ))
        .variant(Mode::new().begin(r"\d{2}:\d{2}:\d{2}(\.\d+)?"))
        .variant(Mode::new().begin(r"\b0x[0-9a-fA-F_]+\b"))
        .variant(Mode::new().begin(r"\b0b[01_]+\b"))
        .variant(Mode::new().begin(r"\b0o[0-7_]+\b"))
        .variant(Mode::new().begin(r"[+-]?\d[\d_]*\.\d[\d_]*([eE][+-]?\d+)?\b"))
        .variant(Mode::new().begin(r"[+-]?\d[\d_]*\b"))
        .shared();

    // Arrays and inline tables may span lines and nest
    let array = Mode::new()
        .begin(r"\[")
        .end(r"\]")
        .relevance(0)
        .keywords(literals())
        .children(modes(&[&comment, &string, &number]))
        .contains_self()
        .shared();
    let inline_table = Mode::new()
        .begin(r"\{")
        .end(r"\}")
        .relevance(0)
        .keywords(literals())
        .child(Mode::new().scope("attr").matching(r"[A-Za-z0-9_\-]+(?=\s*=)"))
        .children(modes(&[&string, &number, &array]))
        .contains_self();

    let value = Mode::new()
        .end("$")
        .relevance(0)
        .keywords(literals())
        .children(modes(&[&comment, &string, &number, &array]))
        .child(inline_table);

    let key = Mode::new()
        .scope("attr")
        .matching(r#"^[\t ]*([A-Za-z0-9_\-]+|"[^"\n]*"|'[^'\n]*')(\s*\.\s*([A-Za-z0-9_\-]+|"[^"\n]*"|'[^'\n]*'))*(?=\s*=)"#)
        .starts(value);

    let table = Mode::new()
        .scope("section")
        .begin(r"^[\t ]*\[\[?")
        .end(r"\]\]?")
        .illegal(r"\n");

    let root: Vec<ModeRef> = vec![comment.into(), table.into(), key.into()];
    Grammar::new("toml", Mode::new().children(root).illegal(r"\S"))
}
