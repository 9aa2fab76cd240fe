//! Error types for glint

use thiserror::Error;

use crate::syntax::IllegalContext;

/// Result type alias for glint operations
pub type Result<T> = std::result::Result<T, HighlightError>;

/// Highlighting error types
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Invalid grammar {language}: {message}")]
    Configuration { language: String, message: String },

    #[error("Illegal lexeme: {0}")]
    IllegalToken(Box<IllegalContext>),

    #[error("Engine fault in {language}: {message}")]
    EngineFault {
        language: String,
        message: String,
        /// Label of the rule involved, if known
        rule: Option<String>,
    },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
