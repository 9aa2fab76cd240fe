//! End-to-end highlighting through the public API

use std::sync::Arc;

use glint::syntax::{Keywords, Mode, Token, TokenTree};
use glint::{Config, Grammar, HighlightError, HighlightOptions, Registry};

fn registry_with(grammars: Vec<Grammar>) -> Registry {
    let mut registry = Registry::new();
    for grammar in grammars {
        registry.register_grammar(grammar).unwrap();
    }
    registry
}

fn string_mode() -> Mode {
    Mode::new().scope("string").begin("\"").end("\"").illegal(r"\n")
}

#[test]
fn test_keyword_then_plain_text() {
    let registry = registry_with(vec![Grammar::new(
        "greet",
        Mode::new().keywords(Keywords::words("hello")),
    )]);
    let result = registry
        .highlight("hello world", &HighlightOptions::new("greet"))
        .unwrap();

    assert_eq!(result.value, "<span class=\"hljs-keyword\">hello</span> world");
    assert_eq!(result.relevance, 1);
    assert!(!result.illegal);

    let children = &result.tree.root().children;
    assert_eq!(children.len(), 2);
    match &children[0] {
        Token::Node(node) => assert_eq!(node.scope.as_deref(), Some("keyword")),
        other => panic!("expected keyword node, got {:?}", other),
    }
    assert_eq!(children[1], Token::Text(" world".to_string()));
}

#[test]
fn test_repeated_keyword_is_capped() {
    let registry = registry_with(vec![Grammar::new(
        "loops",
        Mode::new().keywords(Keywords::words("for|1")),
    )]);
    let result = registry
        .highlight(
            "for for for for for for for for",
            &HighlightOptions::new("loops"),
        )
        .unwrap();
    assert_eq!(result.relevance, 7);
}

#[test]
fn test_keyword_cap_is_configurable() {
    let config = Config {
        max_keyword_hits: 2,
        ..Config::default()
    };
    let mut registry = Registry::with_config(config);
    registry
        .register_grammar(Grammar::new("loops", Mode::new().keywords(Keywords::words("for|1"))))
        .unwrap();
    let result = registry
        .highlight("for for for", &HighlightOptions::new("loops"))
        .unwrap();
    assert_eq!(result.relevance, 2);
}

#[test]
fn test_unterminated_string_is_closed_at_end() {
    let registry = registry_with(vec![Grammar::new("s", Mode::new().child(string_mode()))]);
    let result = registry
        .highlight("\"abc", &HighlightOptions::new("s"))
        .unwrap();
    assert_eq!(result.value, "<span class=\"hljs-string\">&quot;abc</span>");
    assert_eq!(result.relevance, 1);
    assert!(!result.illegal);
}

#[test]
fn test_sublanguage_matches_direct_call() {
    let inner = Grammar::new(
        "inner",
        Mode::new()
            .keywords(Keywords::words("x"))
            .child(Mode::new().scope("number").begin(r"\d+").relevance(0)),
    );
    let outer = Grammar::new(
        "outer",
        Mode::new().child(
            Mode::new()
                .begin("<")
                .end(">")
                .exclude_begin()
                .exclude_end()
                .sub_language("inner"),
        ),
    );
    let registry = registry_with(vec![inner, outer]);

    let direct = registry
        .highlight("x=1", &HighlightOptions::new("inner"))
        .unwrap();
    let nested = registry
        .highlight("<x=1>", &HighlightOptions::new("outer"))
        .unwrap();

    let branch = match &nested.tree.root().children[1] {
        Token::Node(node) => node,
        other => panic!("expected sublanguage node, got {:?}", other),
    };
    assert_eq!(branch.language(), Some("inner"));
    assert_eq!(branch.children, direct.tree.root().children);
    assert_eq!(
        nested.value,
        format!("&lt;<span class=\"language-inner\">{}</span>&gt;", direct.value)
    );
    assert_eq!(nested.relevance, direct.relevance);
}

#[test]
fn test_sublanguage_continues_across_segments() {
    // The inner string opened in the first segment is still open in the second
    let inner = Grammar::new("inner", Mode::new().child(string_mode().illegal("!")));
    let outer = Grammar::new(
        "outer",
        Mode::new().child(
            Mode::new()
                .begin(r"\[")
                .end(r"\]")
                .exclude_begin()
                .exclude_end()
                .sub_language("inner"),
        ),
    );
    let registry = registry_with(vec![inner, outer]);
    let result = registry
        .highlight("[\"a] [b\"]", &HighlightOptions::new("outer"))
        .unwrap();
    assert_eq!(
        result.value,
        "[<span class=\"language-inner\"><span class=\"hljs-string\">&quot;a</span></span>] \
         [<span class=\"language-inner\"><span class=\"hljs-string\">b&quot;</span></span>]"
    );
}

#[test]
fn test_sublanguage_candidates_are_auto_detected() {
    let shell = Grammar::new("shell", Mode::new().keywords(Keywords::words("echo")));
    let sql = Grammar::new("sql", Mode::new().keywords(Keywords::words("select from")));
    let outer = Grammar::new(
        "page",
        Mode::new().child(
            Mode::new()
                .begin("`")
                .end("`")
                .exclude_begin()
                .exclude_end()
                .sub_language_candidates(&["shell", "sql"]),
        ),
    );
    let registry = registry_with(vec![shell, sql, outer]);
    let result = registry
        .highlight("`select a from b`", &HighlightOptions::new("page"))
        .unwrap();
    assert!(result.value.contains("<span class=\"language-sql\">"));
    assert_eq!(result.relevance, 2);
}

#[test]
fn test_backreference_after_sibling_groups() {
    let root = Mode::new()
        .child(Mode::new().scope("meta").matching(r"(x)(y)"))
        .child(Mode::new().scope("meta").matching(r"(z)+"))
        .child(Mode::new().scope("string").matching(r#"(["']).*?\1"#));
    let registry = registry_with(vec![Grammar::new("quotes", root)]);
    let result = registry
        .highlight("xy \"a'b\" 'c'", &HighlightOptions::new("quotes"))
        .unwrap();
    assert_eq!(
        result.value,
        "<span class=\"hljs-meta\">xy</span> \
         <span class=\"hljs-string\">&quot;a&#x27;b&quot;</span> \
         <span class=\"hljs-string\">&#x27;c&#x27;</span>"
    );
}

#[test]
fn test_fence_closes_on_same_marker_after_siblings() {
    let fence = Mode::new()
        .scope("code")
        .begin(r"(`{3,})")
        .end(r"(`{3,})")
        .end_same_as_begin();
    let root = Mode::new()
        .child(Mode::new().scope("a").matching(r"(a)(b)(c)"))
        .child(Mode::new().scope("b").matching(r"((d))"))
        .child(fence);
    let registry = registry_with(vec![Grammar::new("fences", root)]);
    let result = registry
        .highlight("````x```y````z", &HighlightOptions::new("fences"))
        .unwrap();
    assert_eq!(result.value, "<span class=\"hljs-code\">````x```y````</span>z");
}

#[test]
fn test_superset_wins_tie() {
    let registry = Registry::with_builtins();
    let result = registry.highlight_auto("int x;", None);
    assert_eq!(result.language.as_deref(), Some("cpp"));
    let second = result.second_best.unwrap();
    assert_eq!(second.language.as_deref(), Some("c"));
    assert_eq!(second.relevance, result.relevance);
}

#[test]
fn test_zero_width_rules_make_progress() {
    let root = Mode::new().child(Mode::new().begin("x*").end("y*"));

    let registry = registry_with(vec![Grammar::new("empty", root.clone())]);
    let result = registry
        .highlight("ab", &HighlightOptions::new("empty"))
        .unwrap();
    assert_eq!(result.value, "ab");

    let config = Config {
        safe_mode: false,
        ..Config::default()
    };
    let mut strict = Registry::with_config(config);
    strict.register_grammar(Grammar::new("empty", root)).unwrap();
    let err = strict
        .highlight("ab", &HighlightOptions::new("empty"))
        .unwrap_err();
    assert!(matches!(err, HighlightError::EngineFault { .. }));
}

#[test]
fn test_illegal_in_strict_and_safe_mode() {
    let grammar = || Grammar::new("s", Mode::new().child(string_mode()));
    let options = HighlightOptions::new("s").strict_illegals();

    let safe = registry_with(vec![grammar()]);
    let result = safe.highlight("a \"b\nc\"", &options).unwrap();
    assert!(result.illegal);
    assert_eq!(result.relevance, 0);
    assert_eq!(result.value, "a &quot;b\nc&quot;");
    let context = result.illegal_by.unwrap();
    assert_eq!(context.index, 4);
    assert_eq!(context.mode, "string");

    let mut strict = Registry::with_config(Config {
        safe_mode: false,
        ..Config::default()
    });
    strict.register_grammar(grammar()).unwrap();
    let err = strict.highlight("a \"b\nc\"", &options).unwrap_err();
    assert!(matches!(err, HighlightError::IllegalToken(_)));
}

#[test]
fn test_compiled_grammar_is_memoized() {
    let registry = registry_with(vec![Grammar::new(
        "greet",
        Mode::new().keywords(Keywords::words("hello")),
    )]);
    let grammar = registry.get_language("greet").unwrap();
    assert!(grammar.is_compiled());
    let first = grammar.compiled().unwrap();
    let second = grammar.compiled().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_extra_closes_keep_root() {
    let mut tree = TokenTree::new();
    tree.open_node("a");
    tree.add_text("x");
    tree.close_node();
    tree.close_node();
    tree.close_node();
    tree.add_text("y");
    tree.finalize();
    assert_eq!(tree.to_html("hljs-"), "<span class=\"hljs-a\">x</span>y");
}

#[test]
fn test_toml_grammar() {
    let source = r#"
name = "conf"
aliases = ["cfg"]
keywords = "on off"

[[contains]]
scope = "comment"
begin = ";"
end = "$"

[[contains]]
begin = ['\[', '[^\]]+', '\]']
begin_scope = { "2" = "title" }
"#;
    let mut registry = Registry::new();
    registry
        .register_grammar(Grammar::from_toml_str(source).unwrap())
        .unwrap();
    let result = registry
        .highlight("[main] on ; hi", &HighlightOptions::new("cfg"))
        .unwrap();
    assert_eq!(
        result.value,
        "[<span class=\"hljs-title\">main</span>] \
         <span class=\"hljs-keyword\">on</span> \
         <span class=\"hljs-comment\">; hi</span>"
    );
}
