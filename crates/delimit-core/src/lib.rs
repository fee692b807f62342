//! # Delimit Core
//!
//! Finds the delimiter pair enclosing a cursor.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Matcher                           │
//! │  ┌──────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │  Config  │  │ RuleRegistry │  │ TransformPipeline  │  │
//! │  └──────────┘  └──────┬───────┘  └────────────────────┘  │
//! │                       │ Arc<RuleSet>                     │
//! │  ┌────────────────────┴─────────────────────────────┐    │
//! │  │                  MatchSession                    │    │
//! │  │   ScopeCheck ──► SubSearch      BracketCheck     │    │
//! │  │   (scope.rs)    (bracket.rs)    (scan.rs +       │    │
//! │  │                                  bracket.rs)     │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Module Organization
//!
//! Modules the host needs are public and re-exported here; the matchers
//! themselves (`scan`, `bracket`, `scope`, `context`) are private and only
//! reachable through [`MatchSession`].

mod bracket;
pub mod config;
mod context;
pub mod definition;
pub mod matcher;
mod pattern;
pub mod registry;
pub mod rules;
mod scan;
mod scope;
pub mod session;
pub mod token;

pub use config::{Config, ConfigError, EscapeMode, MatchOptions, TransformConfig};
pub use definition::{
    BracketDefinition, LanguageFilter, RuleDefinitions, ScopeDefinition, SubSearch,
    SubSearchValue,
};
pub use matcher::Matcher;
pub use registry::RuleRegistry;
pub use rules::{BracketRule, HookPresence, RuleError, RuleSet, ScopeGroup, ScopeRule};
pub use session::{MatchOutcome, MatchResult, MatchSession, MatchSource, match_cursor};
pub use token::{SearchWindow, Token};

use delimit_plugin::HookRegistry;

/// Builds the rule set for `language` with the built-in hooks.
///
/// Definitions that fail to build are skipped and reported through
/// [`RuleSet::diagnostics`].
pub fn build_rules(language: &str, definitions: &RuleDefinitions) -> RuleSet {
    RuleSet::build(language, definitions, &HookRegistry::with_builtins())
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Hook error: {0}")]
    Hook(#[from] delimit_plugin::HookError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] delimit_buffer::BufferError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use delimit_buffer::Region;

    #[test]
    fn test_build_rules_resolves_builtin_hooks() {
        let defs = RuleDefinitions::new(
            vec![BracketDefinition::new("tag", "(<[a-z]+)", "(</[a-z]+)").with_compare("tags")],
            vec![],
        );
        let rules = build_rules("html", &defs);
        assert!(rules.diagnostics().is_empty());

        let result = match_cursor("<a><b></b></a>", &rules, Region::point(3), &MatchOptions::default());
        assert_eq!(result.pair(), Some((Region::new(0, 2), Region::new(10, 13))));
    }

    #[test]
    fn test_error_conversions() {
        let err: CoreError = ConfigError::NoConfigDir.into();
        assert_eq!(err.to_string(), "Config error: Config directory not found");

        let err: CoreError = delimit_buffer::BufferError::InvalidByteIndex(9).into();
        assert!(matches!(err, CoreError::Buffer(_)));
    }
}
