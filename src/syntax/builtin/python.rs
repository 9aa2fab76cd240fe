//! Python language definition

use crate::syntax::builtin::common::{self, UNDERSCORE_IDENT_RE};
use crate::syntax::{Grammar, Keywords, Mode, Pattern, ScopeSpec};

const KEYWORDS: &str = "and as assert async await break class continue def del elif else \
    except finally for from global if import in is lambda nonlocal not or pass raise return try \
    while with yield";

const BUILTINS: &str = "abs all any ascii bin bool bytearray bytes callable chr classmethod \
    compile complex delattr dict dir divmod enumerate eval exec filter float format frozenset \
    getattr globals hasattr hash help hex id input int isinstance issubclass iter len list locals \
    map max memoryview min next object oct open ord pow print property range repr reversed round \
    set setattr slice sorted staticmethod str sum super tuple type vars zip";

fn keywords() -> Keywords {
    Keywords::categories()
        .category("keyword", KEYWORDS)
        .category("built_in", BUILTINS)
        .category("literal", "False None True")
        .category("variable.language", "self cls")
}

fn number() -> Mode {
    Mode::new()
        .scope("number")
        .relevance(0)
        .variant(Mode::new().begin(r"\b0[xX][0-9a-fA-F_]+\b"))
        .variant(Mode::new().begin(r"\b0[bB][01_]+\b"))
        .variant(Mode::new().begin(r"\b0[oO][0-7_]+\b"))
        .variant(Mode::new().begin(r"\b\d[\d_]*\.\d[\d_]*([eE][+-]?\d+)?j?\b"))
        .variant(Mode::new().begin(r"\b\d[\d_]*j?\b"))
}

fn string() -> Mode {
    let plain = |begin: &str, end: &str| {
        Mode::new()
            .begin(begin)
            .end(end)
            .child(common::backslash_escape())
    };

    let subst = Mode::new()
        .scope("subst")
        .begin(r"\{")
        .end(r"\}")
        .keywords(keywords())
        .child(number())
        .child(plain("'", "'"))
        .child(plain("\"", "\""));
    // `{{` and `}}` are literal braces
    let braces = Mode::new().begin(r"\{\{|\}\}").relevance(0);

    let formatted = |begin: &str, end: &str| {
        Mode::new()
            .begin(begin)
            .end(end)
            .child(common::backslash_escape())
            .child(braces.clone())
            .child(subst.clone())
    };

    Mode::new()
        .scope("string")
        .variant(formatted(r#"([fF][rR]?|[rR][fF])""""#, r#"""""#).relevance(10))
        .variant(formatted(r"([fF][rR]?|[rR][fF])'''", r"'''").relevance(10))
        .variant(plain(r#"([uUbBrR]{0,2})""""#, r#"""""#).relevance(10))
        .variant(plain(r"([uUbBrR]{0,2})'''", r"'''").relevance(10))
        .variant(formatted(r#"([fF][rR]?|[rR][fF])""#, "\"").illegal(r"\n"))
        .variant(formatted(r"([fF][rR]?|[rR][fF])'", "'").illegal(r"\n"))
        .variant(plain(r#"([uUbBrR]{0,2})""#, "\"").illegal(r"\n"))
        .variant(plain(r"([uUbBrR]{0,2})'", "'").illegal(r"\n"))
}

/// Create Python language definition
pub fn python_grammar() -> Grammar {
    let decorator = Mode::new()
        .scope("meta")
        .begin(r"^[\t ]*@")
        .end(r"(?=#)|$")
        .child(number())
        .child(string());

    let definition = |keyword: &str, scope: &str| {
        Mode::new()
            .matching(Pattern::segments([keyword, r"\s+", UNDERSCORE_IDENT_RE]))
            .begin_scope(ScopeSpec::segments([(1, "keyword"), (3, scope)]))
    };

    let root = Mode::new()
        .keywords(keywords())
        .illegal(r"(<\/|\?)|=>")
        .child(common::shebang())
        .child(common::hash_comment())
        .child(string())
        .child(number())
        .child(decorator)
        .child(definition(r"\bdef", "title.function"))
        .child(definition(r"\bclass", "title.class"));

    Grammar::new("python", root).alias("py").alias("gyp")
}
