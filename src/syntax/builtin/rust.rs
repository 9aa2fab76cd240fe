//! Rust language definition

use crate::syntax::builtin::common::{self, UNDERSCORE_IDENT_RE};
use crate::syntax::{Grammar, Keywords, Mode, Pattern, ScopeSpec};

const KEYWORDS: &str = "as async await break const continue crate dyn else enum extern fn for \
    if impl in let loop match mod move mut pub ref return self Self static struct super trait \
    type union unsafe use where while";

const LITERALS: &str = "true false Some None Ok Err";

const TYPES: &str = "bool char str u8 u16 u32 u64 u128 usize i8 i16 i32 i64 i128 isize f32 f64 \
    String Vec Box Rc Arc Option Result";

/// Create Rust language definition
pub fn rust_grammar() -> Grammar {
    let keywords = Keywords::categories()
        .category("keyword", KEYWORDS)
        .category("literal", LITERALS)
        .category("type", TYPES);

    let block_comment = common::comment(r"/\*", r"\*/").contains_self();

    let string = Mode::new()
        .scope("string")
        .begin(r#"b?""#)
        .end("\"")
        .child(common::backslash_escape());

    // r#"..."# closes only on as many hashes as it opened with
    let raw_string = Mode::new()
        .scope("string")
        .begin(r##"b?r(#*)""##)
        .end(r##""(#*)"##)
        .end_same_as_begin();

    let char_literal = Mode::new()
        .scope("string")
        .matching(r"b?'(\\.|\\x[0-9a-fA-F]{2}|\\u\{[0-9a-fA-F]{1,6}\}|[^\\'])'");

    let lifetime = Mode::new()
        .scope("symbol")
        .matching(r"'[a-zA-Z_]\w*")
        .relevance(0);

    let number = Mode::new()
        .scope("number")
        .relevance(0)
        .variant(Mode::new().begin(r"\b0b[01_]+"))
        .variant(Mode::new().begin(r"\b0o[0-7_]+"))
        .variant(Mode::new().begin(r"\b0x[0-9a-fA-F_]+"))
        .variant(Mode::new().begin(
            r"\b\d[\d_]*(\.[0-9_]+)?([eE][+-]?[0-9_]+)?([ui](8|16|32|64|128|size)|f(32|64))?",
        ));

    let attribute = Mode::new()
        .scope("meta")
        .begin(r"#!?\[")
        .end(r"\]")
        .child(string.clone());

    let macro_call = Mode::new()
        .scope("built_in")
        .matching(r"\b[a-zA-Z_]\w*!(?!=)")
        .relevance(0);

    let function = Mode::new()
        .scope("function")
        .begin_keywords("fn")
        .end(r"(\(|<)")
        .exclude_end()
        .child(common::underscore_title());

    let type_decl = Mode::new()
        .matching(Pattern::segments([
            r"\b(?:struct|enum|union|trait)",
            r"\s+",
            UNDERSCORE_IDENT_RE,
        ]))
        .begin_scope(ScopeSpec::segments([(1, "keyword"), (3, "title.class")]));

    let root = Mode::new()
        .keywords(keywords.with_pattern(r"[a-zA-Z_]\w*"))
        .illegal("</")
        .child(common::c_line_comment())
        .child(block_comment)
        .child(raw_string)
        .child(string)
        .child(char_literal)
        .child(lifetime)
        .child(number)
        .child(attribute)
        .child(macro_call)
        .child(function)
        .child(type_decl);

    Grammar::new("rust", root).alias("rs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{HighlightOptions, Registry};

    fn highlight(code: &str) -> String {
        let mut registry = Registry::new();
        registry.register_grammar(rust_grammar()).unwrap();
        registry
            .highlight(code, &HighlightOptions::new("rs"))
            .unwrap()
            .value
    }

    #[test]
    fn test_compiles() {
        assert!(rust_grammar().compiled().is_ok());
    }

    #[test]
    fn test_function_header() {
        assert_eq!(
            highlight("fn main()"),
            "<span class=\"hljs-function\"><span class=\"hljs-keyword\">fn</span> \
             <span class=\"hljs-title\">main</span></span>()"
        );
    }

    #[test]
    fn test_struct_declaration() {
        assert_eq!(
            highlight("pub struct Point;"),
            "<span class=\"hljs-keyword\">pub</span> <span class=\"hljs-keyword\">struct</span> \
             <span class=\"hljs-title class_\">Point</span>;"
        );
    }

    #[test]
    fn test_char_before_lifetime() {
        assert_eq!(
            highlight("'a' 'b"),
            "<span class=\"hljs-string\">&#x27;a&#x27;</span> \
             <span class=\"hljs-symbol\">&#x27;b</span>"
        );
    }

    #[test]
    fn test_raw_string_needs_matching_hashes() {
        assert_eq!(
            highlight(r###"r#"a"b"# x"###),
            "<span class=\"hljs-string\">r#&quot;a&quot;b&quot;#</span> x"
        );
    }

    #[test]
    fn test_macro_is_not_inequality() {
        assert_eq!(
            highlight("a!=b"),
            "a!=b"
        );
        assert_eq!(
            highlight("vec![]"),
            "<span class=\"hljs-built_in\">vec!</span>[]"
        );
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(
            highlight("/* a /* b */ c */ x"),
            "<span class=\"hljs-comment\">/* a <span class=\"hljs-comment\">/* b */</span> c */</span> x"
        );
    }
}
