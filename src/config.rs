//! Configuration file support
//!
//! Loads settings from ~/.glint.toml (or %USERPROFILE%\.glint.toml on Windows)
//!
//! Every key is optional; missing keys keep their defaults.
//!
//! Example:
//! ```text
//! # glint configuration
//! class-prefix = "hljs-"
//! safe-mode = true
//! languages = ["rust", "python"]
//! max-keyword-hits = 7
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Prefix of every CSS class in HTML output
    pub class_prefix: String,
    /// Recover from engine faults and illegal matches instead of failing
    pub safe_mode: bool,
    /// Languages tried by auto-detection; all registered ones when unset
    pub languages: Option<Vec<String>>,
    /// Times one keyword may add to relevance within a highlight call
    pub max_keyword_hits: u32,
    /// Scan iterations allowed before the iteration ratio is checked
    pub iteration_floor: usize,
    /// Scan iterations allowed per byte of progress past the floor
    pub iteration_ratio: usize,
    /// Bytes of input shown on each side of an illegal match
    pub context_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            class_prefix: "hljs-".to_string(),
            safe_mode: true,
            languages: None,
            max_keyword_hits: 7,
            iteration_floor: 100_000,
            iteration_ratio: 3,
            context_window: 100,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(".glint.toml"))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".glint.toml"))
        }
    }

    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Config::default();
        };
        let Ok(contents) = fs::read_to_string(&path) else {
            return Config::default();
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring {}: {}", path.display(), err);
                Config::default()
            }
        }
    }

    /// Parse configuration from TOML
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            let contents = format!(
                "# glint configuration\n# Generated automatically\n\n{}",
                toml::to_string(self)?
            );
            fs::write(path, contents)?;
        }
        Ok(())
    }
}
