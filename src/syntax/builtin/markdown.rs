//! Markdown language definition

use crate::syntax::{Grammar, Mode, Pattern, ScopeSpec};

/// Create Markdown language definition
pub fn markdown_grammar() -> Grammar {
    // A fence closes only on the same run of backticks or tildes it opened with
    let fenced_code = Mode::new()
        .scope("code")
        .begin(r"^[ \t]*(`{3,}|~{3,})[^\n]*$")
        .end(r"^[ \t]*(`{3,}|~{3,})[ \t]*$")
        .end_same_as_begin()
        .relevance(5);

    let indented_code = Mode::new()
        .scope("code")
        .begin(r"^( {4}|\t)")
        .end("$")
        .relevance(0);

    let inline_code = Mode::new().scope("code").matching(r"`[^`\n]+`");

    let strong = Mode::new()
        .scope("strong")
        .relevance(0)
        .variant(Mode::new().begin(r"\*\*[^*\n]+\*\*"))
        .variant(Mode::new().begin(r"__[^_\n]+__"));
    let emphasis = Mode::new()
        .scope("emphasis")
        .relevance(0)
        .variant(Mode::new().begin(r"\*[^*\n]+\*"))
        .variant(Mode::new().begin(r"\b_[^_\n]+_\b"));
    let inline = || {
        vec![
            inline_code.clone(),
            strong.clone(),
            emphasis.clone(),
            link(),
        ]
    };

    let header = Mode::new()
        .scope("section")
        .variant(Mode::new().begin(r"^#{1,6}[ \t]").end("$"))
        .variant(Mode::new().begin(r"^.+?\n(=+|-+)$"))
        .children(inline());

    let quote = Mode::new()
        .scope("quote")
        .begin(r"^>\s+")
        .end("$")
        .children(inline());

    let rule = Mode::new()
        .scope("section")
        .matching(r"^(-{3,}|\*{3,}|_{3,})[ \t]*$");

    let bullet = Mode::new()
        .scope("bullet")
        .matching(r"^[ \t]*([*+-]|\d+\.)(?=\s+)");

    let strike = Mode::new()
        .scope("deletion")
        .matching(r"~~[^~\n]+~~")
        .relevance(0);

    let root = Mode::new()
        .child(fenced_code)
        .child(indented_code)
        .child(header)
        .child(quote)
        .child(rule)
        .child(bullet)
        .child(strike)
        .children(inline());

    Grammar::new("markdown", root)
        .alias("md")
        .alias("mkdown")
        .alias("mkd")
}

/// `[text](url)` and `![alt](src)`
fn link() -> Mode {
    Mode::new()
        .matching(Pattern::segments([
            r"!?\[",
            r"[^\]\n]+",
            r"\]\(",
            r"[^)\n]+",
            r"\)",
        ]))
        .begin_scope(ScopeSpec::segments([(2, "string"), (4, "link")]))
        .relevance(2)
}
