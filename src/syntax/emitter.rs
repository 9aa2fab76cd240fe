//! Token tree
//!
//! The scanner reports what it finds as a stream of open/close/text events.
//! [`TokenTree`] turns them into a tree of scoped nodes and renders it.

use super::scope::{css_class, escape_html, language_scope};

/// A child of a [`Node`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Node(Node),
}

/// A scoped run of tokens
///
/// Nodes without a scope are transparent: their children are rendered in
/// place without a wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub scope: Option<String>,
    pub children: Vec<Token>,
}

impl Node {
    fn scoped(scope: &str) -> Self {
        Self {
            scope: Some(scope.to_string()),
            children: Vec::new(),
        }
    }

    /// Name of the embedded language if this node is a sublanguage root
    pub fn language(&self) -> Option<&str> {
        self.scope.as_deref()?.strip_prefix("language:")
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Token::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Token::Text(text.to_string()));
        }
    }

    fn write_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Token::Text(text) => out.push_str(text),
                Token::Node(node) => node.write_text(out),
            }
        }
    }

    fn write_html(&self, prefix: &str, out: &mut String) {
        if let Some(scope) = &self.scope {
            out.push_str("<span class=\"");
            out.push_str(&css_class(scope, prefix));
            out.push_str("\">");
        }
        for child in &self.children {
            match child {
                Token::Text(text) => out.push_str(&escape_html(text)),
                Token::Node(node) => node.write_html(prefix, out),
            }
        }
        if self.scope.is_some() {
            out.push_str("</span>");
        }
    }
}

/// Builds the tree of one highlight call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTree {
    root: Node,
    /// Nodes opened and not yet closed, innermost last
    open: Vec<Node>,
}

impl TokenTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> &mut Node {
        match self.open.last_mut() {
            Some(node) => node,
            None => &mut self.root,
        }
    }

    pub fn add_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.current().push_text(text);
        }
    }

    /// Text wrapped in its own scope
    pub fn add_keyword(&mut self, text: &str, scope: &str) {
        if text.is_empty() {
            return;
        }
        self.open_node(scope);
        self.add_text(text);
        self.close_node();
    }

    pub fn open_node(&mut self, scope: &str) {
        self.open.push(Node::scoped(scope));
    }

    /// Close the innermost open node; does nothing when only the root is
    /// left
    pub fn close_node(&mut self) {
        if let Some(node) = self.open.pop() {
            self.current().children.push(Token::Node(node));
        }
    }

    pub fn close_all_nodes(&mut self) {
        while !self.open.is_empty() {
            self.close_node();
        }
    }

    /// Splice in the tree of a nested highlight call
    ///
    /// The nested root becomes a node tagged with the language, or stays
    /// transparent when no language was detected.
    pub fn add_sublanguage(&mut self, tree: TokenTree, language: Option<&str>) {
        let mut node = tree.into_root();
        node.scope = language.map(language_scope);
        self.current().children.push(Token::Node(node));
    }

    pub fn finalize(&mut self) {
        self.close_all_nodes();
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(mut self) -> Node {
        self.close_all_nodes();
        self.root
    }

    /// HTML with every scope as a `<span>` whose classes carry `prefix`
    pub fn to_html(&self, prefix: &str) -> String {
        let mut out = String::new();
        self.root.write_html(prefix, &mut out);
        out
    }

    /// The plain text that went into the tree
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.root.write_text(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_nodes() {
        let mut tree = TokenTree::new();
        tree.open_node("string");
        tree.add_text("\"a ");
        tree.add_keyword("\\n", "char.escape");
        tree.add_text("\"");
        tree.close_node();
        tree.finalize();
        assert_eq!(
            tree.to_html("hljs-"),
            "<span class=\"hljs-string\">&quot;a <span class=\"hljs-char escape_\">\\n</span>&quot;</span>"
        );
        assert_eq!(tree.text(), "\"a \\n\"");
    }

    #[test]
    fn test_extra_close_keeps_root() {
        let mut tree = TokenTree::new();
        tree.open_node("x");
        tree.close_node();
        tree.close_node();
        tree.close_node();
        tree.add_text("after");
        tree.finalize();
        assert_eq!(tree.root().children.len(), 2);
        assert_eq!(tree.to_html(""), "<span class=\"x\"></span>after");
    }

    #[test]
    fn test_adjacent_text_merges() {
        let mut tree = TokenTree::new();
        tree.add_text("a");
        tree.add_text("");
        tree.add_text("b");
        assert_eq!(tree.root().children, vec![Token::Text("ab".into())]);
    }

    #[test]
    fn test_finalize_closes_open_nodes() {
        let mut tree = TokenTree::new();
        tree.open_node("a");
        tree.open_node("b");
        tree.add_text("x");
        tree.finalize();
        assert_eq!(
            tree.to_html("p-"),
            "<span class=\"p-a\"><span class=\"p-b\">x</span></span>"
        );
    }

    #[test]
    fn test_sublanguage() {
        let mut inner = TokenTree::new();
        inner.add_keyword("x", "variable");
        inner.add_text("=1");
        inner.finalize();

        let mut outer = TokenTree::new();
        outer.add_sublanguage(inner.clone(), Some("inner"));
        outer.add_sublanguage(inner, None);
        outer.finalize();

        let html = outer.to_html("hljs-");
        assert_eq!(
            html,
            "<span class=\"language-inner\"><span class=\"hljs-variable\">x</span>=1</span>\
             <span class=\"hljs-variable\">x</span>=1"
        );
        match &outer.root().children[0] {
            Token::Node(node) => assert_eq!(node.language(), Some("inner")),
            Token::Text(_) => panic!("expected a node"),
        }
    }
}
