//! # Delimit
//!
//! Reports the bracket, tag or quote pair enclosing each cursor in a file.
//!
//! ## Quick Start
//!
//! ```bash
//! # Match a cursor at byte 10
//! cargo run -- --language rust --cursor 10 src/lib.rs
//!
//! # Several cursors, JSON output
//! cargo run -- --cursor 10 --cursor 42..50 --json notes.txt
//!
//! # With scope classification from the host
//! cargo run -- --scopes scopes.json --cursor 7 script.py
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use delimit_buffer::{Region, ScopeMap, ScopeRun, ScopedView, TextBuffer};
use delimit_core::{Config, EscapeMode, MatchResult, Matcher, TransformConfig};
use delimit_plugin::TransformTargets;

/// Delimit - find the delimiters around a cursor
#[derive(Parser, Debug)]
#[command(name = "delimit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to search
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Configuration file (TOML or JSON); defaults to the user config
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Language name used to select rules
    #[arg(short, long, default_value = "plain text")]
    language: String,

    /// Cursor as a byte offset `N` or a selection `A..B`; repeatable
    #[arg(long = "cursor", value_name = "CURSOR", value_parser = parse_region)]
    cursors: Vec<Region>,

    /// JSON file with scope runs: `[{"begin": 0, "end": 4, "scope": "string"}]`
    #[arg(long, value_name = "JSON")]
    scopes: Option<PathBuf>,

    /// Only report pairs the cursor touches
    #[arg(long)]
    adjacent: bool,

    /// Treat brackets just outside the cursor as enclosing it
    #[arg(long)]
    outside_adjacent: bool,

    /// Search the whole file and match every cursor
    #[arg(long)]
    no_threshold: bool,

    /// Backslash escape reading: `string` or `regex`
    #[arg(long, value_name = "MODE", value_parser = parse_escape_mode)]
    escape_mode: Option<EscapeMode>,

    /// Report the content between each pair as the selection
    #[arg(long)]
    select: bool,

    /// Fail if any rule for the language could not be built
    #[arg(long)]
    strict: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_region(value: &str) -> Result<Region, String> {
    let offset = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid offset `{s}`: {e}"))
    };
    match value.split_once("..") {
        Some((a, b)) => Ok(Region::new(offset(a)?, offset(b)?)),
        None => Ok(Region::point(offset(value)?)),
    }
}

fn parse_escape_mode(value: &str) -> Result<EscapeMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "string" => Ok(EscapeMode::String),
        "regex" => Ok(EscapeMode::Regex),
        other => Err(format!("unknown escape mode `{other}`")),
    }
}

impl Args {
    /// Loads the configuration and applies the command-line overrides.
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::load(),
        };

        config.match_only_adjacent |= self.adjacent;
        config.bracket_outside_adjacent |= self.outside_adjacent;
        config.ignore_threshold |= self.no_threshold;
        if let Some(mode) = self.escape_mode {
            config.bracket_string_escape_mode = mode;
        }
        if self.select {
            config.transforms.push(TransformConfig {
                hook: "select".into(),
                targets: TransformTargets::All,
            });
        }
        Ok(config)
    }

    fn scope_map(&self) -> anyhow::Result<ScopeMap> {
        let Some(path) = &self.scopes else {
            return Ok(ScopeMap::new());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scopes from {}", path.display()))?;
        let runs: Vec<ScopeRun> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid scope runs in {}", path.display()))?;
        Ok(ScopeMap::from_runs(runs)?)
    }
}

fn print_result(result: &MatchResult) {
    let cursor = result.cursor;
    let style = result.style.as_deref().unwrap_or("-");
    let side = |token: Option<delimit_core::Token>| match token {
        Some(t) => format!("{}..{}", t.begin, t.end),
        None => "-".to_string(),
    };
    println!(
        "{}..{}\t{:?}\t{}\t{}\t{}",
        cursor.begin(),
        cursor.end(),
        result.outcome,
        style,
        side(result.left),
        side(result.right.or(result.unmatched)),
    );
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let matcher = Matcher::new(args.config()?);
    if args.strict {
        matcher.check(&args.language)?;
    }

    let buffer = TextBuffer::from_file(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let view = ScopedView::new(buffer, args.scope_map()?);

    let cursors = if args.cursors.is_empty() {
        vec![Region::point(0)]
    } else {
        args.cursors.clone()
    };
    tracing::info!(
        file = %args.file.display(),
        language = %args.language,
        cursors = cursors.len(),
        "Matching"
    );

    let results = matcher.match_selections(&view, &args.language, &cursors);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_result(result);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["delimit", "main.rs"]);
        assert_eq!(args.file, PathBuf::from("main.rs"));
        assert_eq!(args.language, "plain text");
        assert!(args.cursors.is_empty());
        assert!(!args.json);
    }

    #[test]
    fn test_cursor_parsing() {
        let args = Args::parse_from(["delimit", "--cursor", "4", "--cursor", "2..9", "a.txt"]);
        assert_eq!(args.cursors, vec![Region::point(4), Region::new(2, 9)]);
        assert!(Args::try_parse_from(["delimit", "--cursor", "x", "a.txt"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"search_threshold = 100\n").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let args = Args::parse_from([
            "delimit",
            "--config",
            &path,
            "--adjacent",
            "--escape-mode",
            "regex",
            "--select",
            "a.txt",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.search_threshold, 100);
        assert!(config.match_only_adjacent);
        assert_eq!(config.bracket_string_escape_mode, EscapeMode::Regex);
        assert_eq!(config.transforms.last().map(|t| t.hook.as_str()), Some("select"));
    }

    #[test]
    fn test_scope_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"[{"begin": 2, "end": 5, "scope": "string"}]"#)
            .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let args = Args::parse_from(["delimit", "--scopes", &path, "a.txt"]);
        let scopes = args.scope_map().unwrap();
        assert!(scopes.matches(3, "string"));
        assert!(!scopes.matches(6, "string"));
    }
}
