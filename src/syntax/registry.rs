//! Language registry
//!
//! The registry owns the grammars, their aliases and the plugins, and is
//! the entry point for highlighting: by name through [`Registry::highlight`]
//! or by relevance ranking through [`Registry::highlight_auto`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::builtin;
use super::grammar::Grammar;
use super::hooks::{BeforeHighlight, Plugin};
use super::result::{HighlightOptions, HighlightResult};
use super::scanner::{self, ScanOptions};
use crate::config::Config;
use crate::error::{HighlightError, Result};

/// Registered languages plus everything a highlight call needs
pub struct Registry {
    /// Lowercased name to grammar
    languages: HashMap<String, Arc<Grammar>>,
    /// Names in registration order; auto-detection tries them in this order
    order: Vec<String>,
    /// Lowercased alias to lowercased name
    aliases: HashMap<String, String>,
    plugins: Vec<Box<dyn Plugin>>,
    config: Config,
    /// Warnings already logged
    warned: Mutex<HashSet<String>>,
}

impl Registry {
    /// Create an empty registry with default settings
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            languages: HashMap::new(),
            order: Vec::new(),
            aliases: HashMap::new(),
            plugins: Vec::new(),
            config,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Create a registry holding the built-in languages
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for grammar in builtin::all_grammars() {
            // `register` logs the failure and leaves a placeholder
            if let Err(err) = registry.register_grammar(grammar) {
                log::debug!("built-in grammar kept as placeholder: {}", err);
            }
        }
        registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration
    pub fn configure(&mut self, config: Config) {
        self.config = config;
    }

    /// Register the grammar built by `factory` under `name`
    ///
    /// The grammar is compiled straight away. If building or compiling it
    /// fails, the error is logged and returned, and an empty placeholder
    /// grammar is registered under `name` instead.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: FnOnce() -> Result<Grammar>,
    {
        let built = factory().and_then(|mut grammar| {
            grammar.name = name.to_string();
            grammar.compiled()?;
            Ok(grammar)
        });

        match built {
            Ok(grammar) => {
                let aliases = grammar.aliases.clone();
                self.insert(name, grammar);
                for alias in &aliases {
                    self.register_alias(alias, name);
                }
                Ok(())
            }
            Err(err) => {
                log::error!("language definition for `{}` could not be registered: {}", name, err);
                self.insert(name, Grammar::placeholder(name));
                Err(err)
            }
        }
    }

    /// Register an already built grammar under its own name
    pub fn register_grammar(&mut self, grammar: Grammar) -> Result<()> {
        let name = grammar.name.clone();
        self.register(&name, move || Ok(grammar))
    }

    /// Load a TOML grammar file and register it
    pub fn load_grammar(&mut self, path: &Path) -> Result<String> {
        let grammar = Grammar::from_path(path)?;
        let name = grammar.name.clone();
        self.register_grammar(grammar)?;
        Ok(name)
    }

    fn insert(&mut self, name: &str, grammar: Grammar) {
        let key = name.to_lowercase();
        if !self.languages.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.languages.insert(key, Arc::new(grammar));
    }

    /// Remove a language and every alias pointing at it
    pub fn unregister(&mut self, name: &str) {
        let key = name.to_lowercase();
        self.languages.remove(&key);
        self.order.retain(|n| *n != key);
        self.aliases.retain(|_, target| *target != key);
    }

    pub fn register_aliases<S: AsRef<str>>(&mut self, aliases: &[S], language: &str) {
        for alias in aliases {
            self.register_alias(alias.as_ref(), language);
        }
    }

    fn register_alias(&mut self, alias: &str, language: &str) {
        self.aliases
            .insert(alias.to_lowercase(), language.to_lowercase());
    }

    /// Look up a language by name, then by alias
    pub fn get_language(&self, name: &str) -> Option<Arc<Grammar>> {
        let key = name.to_lowercase();
        if let Some(grammar) = self.languages.get(&key) {
            return Some(Arc::clone(grammar));
        }
        let target = self.aliases.get(&key)?;
        self.languages.get(target).map(Arc::clone)
    }

    /// Registered language names in registration order
    pub fn list_languages(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Whether `name` takes part in auto-detection
    pub fn auto_detection(&self, name: &str) -> bool {
        self.get_language(name)
            .map_or(false, |grammar| !grammar.disable_autodetect)
    }

    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Highlight `code` in a known language
    ///
    /// Plugins see the input before and the result after the call; a plugin
    /// may also provide the result itself.
    pub fn highlight(&self, code: &str, options: &HighlightOptions) -> Result<HighlightResult> {
        let mut context = BeforeHighlight {
            code: code.to_string(),
            language: options.language.clone(),
            result: None,
        };
        for plugin in &self.plugins {
            plugin.before_highlight(&mut context);
        }

        let mut result = match context.result.take() {
            Some(result) => result,
            None => {
                if self.get_language(&context.language).is_none() {
                    log::error!("could not find the language `{}`", context.language);
                    return Err(HighlightError::UnknownLanguage(context.language));
                }
                let scan = ScanOptions {
                    ignore_illegals: options.ignore_illegals,
                    safe_mode: self.config.safe_mode,
                };
                scanner::highlight(self, &context.language, &context.code, scan, None)?
            }
        };

        for plugin in &self.plugins {
            plugin.after_highlight(&mut result);
        }
        Ok(result)
    }

    /// Highlight `code` with the language that scores best
    ///
    /// Every candidate (the given subset, else the configured one, else all
    /// registered languages) is scanned with illegal matches counting
    /// against it. A plain-text result of relevance 0 always competes, so
    /// the result has no language when nothing scores. The runner-up is
    /// kept in [`HighlightResult::second_best`].
    pub fn highlight_auto(&self, code: &str, languages: Option<&[String]>) -> HighlightResult {
        let candidates: Vec<String> = match languages.or(self.config.languages.as_deref()) {
            Some(subset) => subset.to_vec(),
            None => self.order.clone(),
        };

        let prefix = &self.config.class_prefix;
        let mut results = vec![HighlightResult::plain(None, code, prefix)];
        let scan = ScanOptions {
            ignore_illegals: false,
            safe_mode: true,
        };
        for name in &candidates {
            if !self.auto_detection(name) {
                continue;
            }
            match scanner::highlight(self, name, code, scan, None) {
                Ok(result) => results.push(result),
                Err(err) => log::debug!("skipping `{}` in auto-detection: {}", name, err),
            }
        }

        self.rank(&mut results);
        for result in &results {
            log::debug!(
                "auto-detect: {} scored {}{}",
                result.language.as_deref().unwrap_or("plaintext"),
                result.relevance,
                if result.illegal { " (illegal)" } else { "" }
            );
        }

        let mut ranked = results.into_iter();
        let mut best = ranked
            .next()
            .unwrap_or_else(|| HighlightResult::plain(None, code, prefix));
        best.second_best = ranked.next().map(Box::new);
        best
    }

    /// Higher relevance first; on a tie a language moves ahead of the one
    /// it declares itself a superset of, wherever that one sits in the tie
    fn rank(&self, results: &mut [HighlightResult]) {
        results.sort_by(|a, b| b.relevance.cmp(&a.relevance));

        let mut start = 0;
        while start < results.len() {
            let relevance = results[start].relevance;
            let end = start
                + results[start..]
                    .iter()
                    .take_while(|r| r.relevance == relevance)
                    .count();
            for i in start + 1..end {
                let base = (start..i).find(|&j| {
                    match (results[j].language.as_deref(), results[i].language.as_deref()) {
                        (Some(base), Some(language)) => self.is_superset(language, base),
                        _ => false,
                    }
                });
                if let Some(j) = base {
                    results[j..=i].rotate_right(1);
                }
            }
            start = end;
        }
    }

    fn is_superset(&self, language: &str, of: &str) -> bool {
        self.get_language(language)
            .and_then(|grammar| grammar.superset_of.clone())
            .map_or(false, |base| base.eq_ignore_ascii_case(of))
    }

    /// Log a warning the first time it is seen by this registry
    pub fn warn_once(&self, message: &str) {
        if let Ok(mut warned) = self.warned.lock() {
            if warned.insert(message.to_string()) {
                log::warn!("{}", message);
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
