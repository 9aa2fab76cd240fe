//! Plain text: no highlighting, never auto-detected

use crate::syntax::{Grammar, Mode};

pub fn plaintext_grammar() -> Grammar {
    Grammar::new("plaintext", Mode::new())
        .alias("text")
        .alias("txt")
        .disable_autodetect()
}
