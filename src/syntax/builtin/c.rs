//! C and C++ language definitions

use crate::syntax::builtin::common::{self, UNDERSCORE_IDENT_RE};
use crate::syntax::{Grammar, Keywords, Mode};

const C_KEYWORDS: &str = "auto break case char const continue default do double else enum \
    extern float for goto if inline int long register restrict return short signed sizeof \
    static struct switch typedef union unsigned void volatile while _Alignas _Alignof _Atomic \
    _Bool _Complex _Generic _Imaginary _Noreturn _Static_assert _Thread_local";

const CPP_KEYWORDS: &str = "alignas alignof and and_eq asm bitand bitor bool catch class \
    compl concept consteval constexpr constinit const_cast co_await co_return co_yield decltype \
    delete dynamic_cast explicit export friend mutable namespace new noexcept not not_eq \
    operator or or_eq private protected public reinterpret_cast requires static_assert \
    static_cast template this thread_local throw try typeid typename using virtual xor xor_eq";

const TYPES: &str = "size_t ptrdiff_t intptr_t uintptr_t int8_t int16_t int32_t int64_t \
    uint8_t uint16_t uint32_t uint64_t FILE";

const PREPROCESSOR: &str = "if else elif endif define undef warning error line pragma ifdef \
    ifndef include";

/// Create C language definition
pub fn c_grammar() -> Grammar {
    let keywords = Keywords::categories()
        .category("keyword", C_KEYWORDS)
        .category("type", TYPES)
        .category("literal", "NULL true false");
    Grammar::new("c", c_like_root(keywords)).alias("h")
}

/// Create C++ language definition
///
/// Every C program is also read as C++; ties in auto-detection go to C++.
pub fn cpp_grammar() -> Grammar {
    let keywords = Keywords::categories()
        .category("keyword", &format!("{} {}", C_KEYWORDS, CPP_KEYWORDS))
        .category("type", &format!("{} string vector map", TYPES))
        .category("literal", "NULL nullptr true false");
    Grammar::new("cpp", c_like_root(keywords))
        .alias("cc")
        .alias("c++")
        .alias("h++")
        .alias("hpp")
        .alias("hh")
        .alias("hxx")
        .alias("cxx")
        .superset_of("c")
}

fn c_like_root(keywords: Keywords) -> Mode {
    let char_literal = Mode::new()
        .scope("string")
        .matching(r"'(\\.|[^\\'\n])+'");

    let preprocessor = Mode::new()
        .scope("meta")
        .begin(r"#\s*[a-z]+\b")
        .end("$")
        .keywords(Keywords::categories().category("keyword", PREPROCESSOR))
        // line continuation
        .child(Mode::new().begin(r"\\\n").relevance(0))
        .child(common::quote_string())
        .child(Mode::new().scope("string").matching(r"<[^\n>]*>"))
        .child(common::c_line_comment())
        .child(common::c_block_comment());

    let type_name = Mode::new()
        .scope("title.class")
        .matching(UNDERSCORE_IDENT_RE)
        .before_match(r"\b(?:struct|enum|union|class)\s+")
        .keywords(Keywords::words("struct enum union class"));

    let call = Mode::new()
        .scope("title.function")
        .matching(r"\b(?!(?:if|while|for|switch|return|sizeof)\b)[a-zA-Z_]\w*(?=\s*\()")
        .relevance(0);

    Mode::new()
        .keywords(keywords)
        .illegal("</")
        .child(preprocessor)
        .child(common::c_line_comment())
        .child(common::c_block_comment())
        .child(common::quote_string())
        .child(char_literal)
        .child(common::c_number())
        .child(type_name)
        .child(call)
}
