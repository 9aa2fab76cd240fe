//! glint - grammar-driven syntax highlighting
//!
//! Languages are described as trees of modes (see [`syntax::Mode`]),
//! compiled once into multi-pattern matchers and scanned into a token tree
//! that renders as HTML. A [`Registry`] holds the languages and can pick
//! the most likely one for a piece of code.
//!
//! ```no_run
//! use glint::{HighlightOptions, Registry};
//!
//! let registry = Registry::with_builtins();
//! let result = registry
//!     .highlight("fn main() {}", &HighlightOptions::new("rust"))
//!     .unwrap();
//! println!("{}", result.value);
//! ```

pub mod config;
pub mod error;
pub mod syntax;

pub use config::Config;
pub use error::{HighlightError, Result};
pub use syntax::{Grammar, HighlightOptions, HighlightResult, Mode, Registry};
