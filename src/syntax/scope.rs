//! Scope names and their rendering
//!
//! A scope is a dotted name such as `title.function`. In HTML output the
//! first part gets the class prefix and every later part a suffix of one
//! more underscore than the one before it, so `title.function.invoke`
//! becomes `hljs-title function_ invoke__`.

/// Prefix marking a scope as a sublanguage root
const LANGUAGE_PREFIX: &str = "language:";

/// CSS class list for a scope
pub fn css_class(scope: &str, prefix: &str) -> String {
    if let Some(language) = scope.strip_prefix(LANGUAGE_PREFIX) {
        return format!("language-{}", language);
    }

    let mut parts = scope.split('.');
    let mut class = format!("{}{}", prefix, parts.next().unwrap_or(""));
    for (depth, part) in parts.enumerate() {
        class.push(' ');
        class.push_str(part);
        class.push_str(&"_".repeat(depth + 1));
    }
    class
}

/// Scope marking a sublanguage root
pub fn language_scope(language: &str) -> String {
    format!("{}{}", LANGUAGE_PREFIX, language)
}

/// Escape the characters that are significant in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_html`]
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
