//! Matcher configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on the struct fills every missing field from
//! `Default::default()`, so a settings file only needs the keys it changes.
//! A file that lists `brackets` replaces the built-in rule pack; extra
//! rules belong in `user_brackets`, which are appended after it.

use std::path::{Path, PathBuf};

use delimit_plugin::{HookRegistry, TransformPipeline, TransformTargets};
use serde::{Deserialize, Serialize};

use crate::definition::{
    BracketDefinition, LanguageFilter, RuleDefinitions, ScopeDefinition, SubSearch,
};

/// How a run of backslashes before a token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// An odd number of backslashes escapes the token
    #[default]
    String,
    /// The buffer holds a regex inside a string literal: the first
    /// backslash belongs to the literal, the rest are counted for parity
    Regex,
}

impl EscapeMode {
    /// Returns true if a token preceded by `backslashes` is escaped.
    pub fn is_escaped(self, backslashes: usize) -> bool {
        match self {
            EscapeMode::String => backslashes % 2 == 1,
            EscapeMode::Regex => backslashes > 0 && (backslashes - 1) % 2 == 1,
        }
    }
}

/// Per-call matching options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Only report pairs the cursor touches
    pub adjacent_only: bool,
    /// A bracket just outside the cursor counts as enclosing it
    pub outside_adjacent: bool,
    /// Search window width in bytes; `None` searches the whole buffer
    pub search_threshold: Option<usize>,
    pub escape_mode: EscapeMode,
    /// Cursors past this many are passed through unmatched
    pub selection_limit: Option<usize>,
    /// A pass with this many cursors or more is abandoned
    pub max_selections: Option<usize>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            adjacent_only: false,
            outside_adjacent: false,
            search_threshold: Some(DEFAULT_SEARCH_THRESHOLD),
            escape_mode: EscapeMode::default(),
            selection_limit: Some(DEFAULT_AUTO_SELECTION_THRESHOLD),
            max_selections: Some(DEFAULT_SEARCH_THRESHOLD),
        }
    }
}

pub const DEFAULT_SEARCH_THRESHOLD: usize = 5000;
pub const DEFAULT_AUTO_SELECTION_THRESHOLD: usize = 10;

/// One configured transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Registered transform name
    pub hook: String,
    /// Rule names the stage applies to
    #[serde(default = "all_rules")]
    pub targets: TransformTargets,
}

fn all_rules() -> TransformTargets {
    TransformTargets::All
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search window width in bytes
    pub search_threshold: usize,

    /// Search the whole buffer and match every cursor
    pub ignore_threshold: bool,

    /// Cursors matched per pass before the rest are passed through
    pub auto_selection_threshold: usize,

    pub match_only_adjacent: bool,

    pub bracket_outside_adjacent: bool,

    pub bracket_string_escape_mode: EscapeMode,

    /// Built-in literal rules
    pub brackets: Vec<BracketDefinition>,

    /// Literal rules appended after `brackets`
    pub user_brackets: Vec<BracketDefinition>,

    /// Built-in scope rules
    pub scope_brackets: Vec<ScopeDefinition>,

    /// Scope rules appended after `scope_brackets`
    pub user_scope_brackets: Vec<ScopeDefinition>,

    /// Transform stages, in order
    pub transforms: Vec<TransformConfig>,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    ///
    /// `.json` and `.sublime-settings` files are read as JSON, anything
    /// else as TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json" | "sublime-settings")
        );
        let config: Self = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("delimit").join("config.toml"))
    }

    /// Saves the config as TOML to `path`.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// All rule definitions, user rules last.
    pub fn definitions(&self) -> RuleDefinitions {
        RuleDefinitions {
            brackets: self
                .brackets
                .iter()
                .chain(&self.user_brackets)
                .cloned()
                .collect(),
            scope_brackets: self
                .scope_brackets
                .iter()
                .chain(&self.user_scope_brackets)
                .cloned()
                .collect(),
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            adjacent_only: self.match_only_adjacent,
            outside_adjacent: self.bracket_outside_adjacent,
            search_threshold: (!self.ignore_threshold).then_some(self.search_threshold),
            escape_mode: self.bracket_string_escape_mode,
            selection_limit: (!self.ignore_threshold).then_some(self.auto_selection_threshold),
            max_selections: Some(self.search_threshold),
        }
    }

    /// Builds the transform pipeline, skipping stages naming unknown hooks.
    pub fn transform_pipeline(&self, hooks: &HookRegistry) -> TransformPipeline {
        let mut pipeline = TransformPipeline::new();
        for stage in &self.transforms {
            match hooks.transform(&stage.hook) {
                Ok(transform) => {
                    pipeline.push(stage.hook.clone(), stage.targets.clone(), transform);
                }
                Err(e) => tracing::warn!("Skipping transform stage: {}", e),
            }
        }
        pipeline
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_threshold: DEFAULT_SEARCH_THRESHOLD,
            ignore_threshold: false,
            auto_selection_threshold: DEFAULT_AUTO_SELECTION_THRESHOLD,
            match_only_adjacent: false,
            bracket_outside_adjacent: false,
            bracket_string_escape_mode: EscapeMode::default(),
            brackets: default_brackets(),
            user_brackets: Vec::new(),
            scope_brackets: default_scope_brackets(),
            user_scope_brackets: Vec::new(),
            transforms: Vec::new(),
        }
    }
}

const MARKUP_LANGUAGES: [&str; 4] = ["html", "xml", "php", "html (rails)"];
const GENERIC_LANGUAGES: [&str; 6] = ["c++", "c#", "java", "rust", "swift", "typescript"];

fn default_brackets() -> Vec<BracketDefinition> {
    let literal = |name: &str, open: &str, close: &str| {
        BracketDefinition::new(name, open, close)
            .with_style(name)
            .with_sub_search(SubSearch::Also)
            .escape_sensitive()
            .excluding("string")
            .excluding("comment")
    };

    vec![
        literal("round", r"(\()", r"(\))"),
        literal("square", r"(\[)", r"(\])"),
        literal("curly", r"(\{)", r"(\})"),
        BracketDefinition::new("angle", "(<)", "(>)")
            .with_style("angle")
            .excluding("string")
            .excluding("comment")
            .excluding("keyword.operator")
            .for_languages(LanguageFilter::Whitelist, GENERIC_LANGUAGES),
        BracketDefinition::new("tag", r"(<[A-Za-z][\w:.-]*)", r"(</[A-Za-z][\w:.-]*)")
            .with_style("tag")
            .with_compare("tags")
            .excluding("comment")
            .for_languages(LanguageFilter::Whitelist, MARKUP_LANGUAGES),
    ]
}

fn default_scope_brackets() -> Vec<ScopeDefinition> {
    vec![
        ScopeDefinition::new("double_quote", ["string"], r#"(")"#, r#"(")"#)
            .with_style("double_quote")
            .with_sub_search(SubSearch::Also),
        ScopeDefinition::new("single_quote", ["string"], "(')", "(')")
            .with_style("single_quote")
            .with_sub_search(SubSearch::Also),
    ]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
