//! Configured matching, end to end.
//!
//! ## Learning: The Facade Pattern
//!
//! `Matcher` ties the pieces together: configuration, hooks, the
//! per-language rule cache and the transform pipeline. Hosts that just
//! want "match these cursors in this buffer" only talk to `Matcher`;
//! hosts that need finer control use [`RuleSet`] and
//! [`MatchSession`] directly.

use std::path::Path;
use std::sync::Arc;

use delimit_buffer::{BufferView, Region};
use delimit_plugin::{HookRegistry, TransformPipeline};

use crate::config::Config;
use crate::registry::RuleRegistry;
use crate::rules::RuleSet;
use crate::session::{MatchResult, MatchSession};
use crate::{CoreError, CoreResult};

/// A configured matcher.
///
/// ## Thread Safety
///
/// `Matcher` is `Send + Sync`. Rule sets are built lazily behind a lock and
/// shared read-only, so several threads may match through one `Matcher`.
pub struct Matcher {
    config: Config,
    hooks: HookRegistry,
    rules: RuleRegistry,
    transforms: TransformPipeline,
}

impl Matcher {
    /// Creates a matcher using the built-in hooks.
    pub fn new(config: Config) -> Self {
        Self::with_hooks(config, HookRegistry::with_builtins())
    }

    /// Creates a matcher resolving hook names against `hooks`.
    pub fn with_hooks(config: Config, hooks: HookRegistry) -> Self {
        let transforms = config.transform_pipeline(&hooks);
        let rules = RuleRegistry::new(config.definitions(), hooks.clone());
        Self {
            config,
            hooks,
            rules,
            transforms,
        }
    }

    /// Creates a matcher from a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        Ok(Self::new(Config::load_from(path)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration. Cached rule sets are dropped.
    pub fn set_config(&mut self, config: Config) {
        self.transforms = config.transform_pipeline(&self.hooks);
        self.rules.reconfigure(config.definitions());
        self.config = config;
    }

    /// The rule set for `language`.
    pub fn rules_for(&self, language: &str) -> Arc<RuleSet> {
        self.rules.rules_for(language)
    }

    /// Fails with the first rule definition that had to be skipped for
    /// `language`.
    pub fn check(&self, language: &str) -> CoreResult<()> {
        match self.rules_for(language).diagnostics().first() {
            Some(error) => Err(CoreError::Rule(error.clone())),
            None => Ok(()),
        }
    }

    /// Matches one cursor.
    pub fn match_cursor<B>(&self, view: &B, language: &str, cursor: Region) -> MatchResult
    where
        B: BufferView + ?Sized,
    {
        let rules = self.rules_for(language);
        self.session(&rules).match_cursor(view, cursor)
    }

    /// Matches every cursor, in order.
    pub fn match_selections<B>(&self, view: &B, language: &str, cursors: &[Region]) -> Vec<MatchResult>
    where
        B: BufferView + ?Sized,
    {
        let rules = self.rules_for(language);
        self.session(&rules).match_selections(view, cursors)
    }

    fn session<'a>(&'a self, rules: &'a RuleSet) -> MatchSession<'a> {
        MatchSession::new(rules, self.config.match_options()).with_transforms(&self.transforms)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
