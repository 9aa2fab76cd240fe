//! Built-in language definitions
//!
//! This module provides syntax highlighting definitions for
//! common programming languages.

mod c;
pub mod common;
mod markdown;
mod plaintext;
mod python;
mod rust;
mod toml_lang;

use super::grammar::Grammar;

/// Get all built-in language definitions
pub fn all_grammars() -> Vec<Grammar> {
    vec![
        plaintext::plaintext_grammar(),
        rust::rust_grammar(),
        c::c_grammar(),
        c::cpp_grammar(),
        python::python_grammar(),
        toml_lang::toml_grammar(),
        markdown::markdown_grammar(),
    ]
}
