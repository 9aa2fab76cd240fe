//! glint - syntax highlighter command line
//!
//! Reads source code from a file or stdin and writes highlighted HTML to
//! stdout.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use fern::Dispatch;
use log::LevelFilter;

use glint::{Config, HighlightOptions, Registry, Result};

/// Parsed command line
#[derive(Debug, Default)]
struct Options {
    language: Option<String>,
    grammars: Vec<PathBuf>,
    file: Option<PathBuf>,
    prefix: Option<String>,
    strict: bool,
    list: bool,
    verbose: bool,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Try 'glint --help' for more information.");
            process::exit(2);
        }
    };

    if let Err(e) = setup_logging(options.verbose) {
        eprintln!("Error: {}", e);
    }

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Parse arguments; `None` means help or version was printed
fn parse_args(args: &[String]) -> std::result::Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--version" | "-V" => {
                print_version();
                return Ok(None);
            }
            "--language" | "-l" => {
                let value = iter.next().ok_or("--language needs a value")?;
                options.language = Some(value.clone());
            }
            "--grammar" | "-g" => {
                let value = iter.next().ok_or("--grammar needs a path")?;
                options.grammars.push(PathBuf::from(value));
            }
            "--prefix" => {
                let value = iter.next().ok_or("--prefix needs a value")?;
                options.prefix = Some(value.clone());
            }
            "--list" => options.list = true,
            "--strict" => options.strict = true,
            "--verbose" | "-v" => options.verbose = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(format!("unknown option '{}'", other));
            }
            path => {
                if options.file.is_some() {
                    return Err("only one input file may be given".to_string());
                }
                if path != "-" {
                    options.file = Some(PathBuf::from(path));
                }
            }
        }
    }

    Ok(Some(options))
}

fn setup_logging(verbose: bool) -> std::result::Result<(), log::SetLoggerError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{:<5}] {}", record.level(), message))
        })
        .level(level)
        .chain(io::stderr())
        .apply()
}

fn run(options: &Options) -> Result<()> {
    let mut config = Config::load();
    if let Some(prefix) = &options.prefix {
        config.class_prefix = prefix.clone();
    }
    if options.strict {
        config.safe_mode = false;
    }

    let mut registry = Registry::with_builtins();
    registry.configure(config);
    for path in &options.grammars {
        let name = registry.load_grammar(path)?;
        log::debug!("loaded grammar `{}` from {}", name, path.display());
    }

    if options.list {
        for name in registry.list_languages() {
            let marker = if registry.auto_detection(&name) { "" } else { " (no auto-detect)" };
            println!("{}{}", name, marker);
        }
        return Ok(());
    }

    let code = match &options.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut code = String::new();
            io::stdin().read_to_string(&mut code)?;
            code
        }
    };

    let result = match &options.language {
        Some(language) => {
            let mut highlight = HighlightOptions::new(language);
            if options.strict {
                highlight = highlight.strict_illegals();
            }
            registry.highlight(&code, &highlight)?
        }
        None => {
            let result = registry.highlight_auto(&code, None);
            eprintln!(
                "language: {} (relevance {})",
                result.language.as_deref().unwrap_or("none"),
                result.relevance
            );
            if let Some(second) = &result.second_best {
                eprintln!(
                    "runner-up: {} (relevance {})",
                    second.language.as_deref().unwrap_or("none"),
                    second.relevance
                );
            }
            result
        }
    };

    if let Some(error) = &result.error_raised {
        log::warn!("highlighting fell back to plain text: {}", error);
    }
    println!("{}", result.value);
    Ok(())
}

fn print_usage() {
    println!("glint {} - grammar-driven syntax highlighter", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: glint [OPTIONS] [FILE]");
    println!();
    println!("Reads FILE (or stdin when FILE is missing or '-') and prints HTML.");
    println!();
    println!("Options:");
    println!("  -l, --language NAME  Highlight as NAME instead of auto-detecting");
    println!("  -g, --grammar PATH   Load a TOML grammar file (repeatable)");
    println!("      --list           List the registered languages");
    println!("      --strict         Fail on illegal input and engine faults");
    println!("      --prefix PREFIX  CSS class prefix (default from config, else hljs-)");
    println!("  -v, --verbose        Log debug output to stderr");
    println!("  -h, --help           Show this help message");
    println!("  -V, --version        Show version information");
    println!();
    if let Some(path) = Config::config_path() {
        println!("Configuration is read from {}", path.display());
    }
}

fn print_version() {
    println!("glint {}", env!("CARGO_PKG_VERSION"));
}
