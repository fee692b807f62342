//! Compiled, language-filtered rule sets.
//!
//! A [`RuleSet`] is built once per language from the configured
//! definitions and never mutated afterwards. Malformed definitions are
//! logged, recorded as diagnostics and skipped; the rest of the set is
//! built as usual.

use std::fmt;
use std::sync::Arc;

use delimit_plugin::{
    BracketSide, Comparator, HookError, HookKind, HookRegistry, NoComparison, NoPostMatch,
    NoValidation, PostMatcher, Validator,
};
use regex::{Regex, RegexBuilder};

use crate::definition::{BracketDefinition, RuleDefinitions, ScopeDefinition, SubSearch};
use crate::pattern::TokenPattern;
use crate::token::Token;

/// Style used when a definition names none.
pub const DEFAULT_STYLE: &str = "default";

/// Why a rule definition was skipped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("Rule #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Rule `{rule}` has an invalid {side} pattern: {source}")]
    InvalidPattern {
        rule: String,
        side: &'static str,
        source: regex::Error,
    },

    #[error("Rule `{rule}` refers to unknown {kind} hook `{hook}`")]
    UnknownHook {
        rule: String,
        kind: HookKind,
        hook: String,
    },

    #[error("Rule `{rule}` failed to load a hook: {message}")]
    HookLoad { rule: String, message: String },

    #[error("Rule `{rule}` has an invalid sub-search mode `{value}`")]
    InvalidSubSearch { rule: String, value: String },

    #[error("Rule `{rule}` breaks the combined {mode} pattern: {source}")]
    Combined {
        rule: String,
        mode: &'static str,
        source: regex::Error,
    },
}

/// Which hook kinds are defined by at least one rule of a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookPresence {
    pub validate: bool,
    pub compare: bool,
    pub post_match: bool,
}

impl HookPresence {
    fn merge(&mut self, other: HookPresence) {
        self.validate |= other.validate;
        self.compare |= other.compare;
        self.post_match |= other.post_match;
    }
}

/// The hooks attached to one rule. Absent hooks are no-ops.
#[derive(Clone)]
pub struct RuleHooks {
    pub(crate) validate: Arc<dyn Validator>,
    pub(crate) compare: Arc<dyn Comparator>,
    pub(crate) post_match: Arc<dyn PostMatcher>,
    present: HookPresence,
}

impl Default for RuleHooks {
    fn default() -> Self {
        Self {
            validate: Arc::new(NoValidation),
            compare: Arc::new(NoComparison),
            post_match: Arc::new(NoPostMatch),
            present: HookPresence::default(),
        }
    }
}

impl RuleHooks {
    fn resolve(
        rule: &str,
        validate: Option<&str>,
        compare: Option<&str>,
        post_match: Option<&str>,
        registry: &HookRegistry,
    ) -> Result<Self, RuleError> {
        let load_error = |e: HookError| match e {
            HookError::NotFound { kind, name } => RuleError::UnknownHook {
                rule: rule.to_string(),
                kind,
                hook: name,
            },
            other => RuleError::HookLoad {
                rule: rule.to_string(),
                message: other.to_string(),
            },
        };

        let mut hooks = Self::default();
        if let Some(name) = validate {
            hooks.validate = registry.validator(name).map_err(load_error)?;
            hooks.present.validate = true;
        }
        if let Some(name) = compare {
            hooks.compare = registry.comparator(name).map_err(load_error)?;
            hooks.present.compare = true;
        }
        if let Some(name) = post_match {
            hooks.post_match = registry.post_matcher(name).map_err(load_error)?;
            hooks.present.post_match = true;
        }
        Ok(hooks)
    }

    /// Which hooks were named by the definition.
    pub fn present(&self) -> HookPresence {
        self.present
    }
}

impl fmt::Debug for RuleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuleHooks").field(&self.present).finish()
    }
}

fn compile(rule: &str, side: &'static str, source: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            rule: rule.to_string(),
            side,
            source,
        })
}

fn sub_search_mode(
    rule: &str,
    value: Option<&crate::definition::SubSearchValue>,
) -> Result<SubSearch, RuleError> {
    match value {
        None => Ok(SubSearch::Never),
        Some(value) => value.parse().map_err(|value| RuleError::InvalidSubSearch {
            rule: rule.to_string(),
            value,
        }),
    }
}

/// A literal-pattern delimiter rule.
#[derive(Debug, Clone)]
pub struct BracketRule {
    pub name: String,
    pub style: String,
    open: Regex,
    close: Regex,
    pub(crate) hooks: RuleHooks,
    pub scope_exclude: Vec<String>,
    pub scope_exclude_exceptions: Vec<String>,
    pub sub_search: SubSearch,
    /// Backslash-escaped tokens are illegal
    pub ignore_string_escape: bool,
}

impl BracketRule {
    /// Compiles definition number `index`.
    pub fn from_definition(
        index: usize,
        def: &BracketDefinition,
        registry: &HookRegistry,
    ) -> Result<Self, RuleError> {
        let name = def
            .name
            .clone()
            .ok_or(RuleError::MissingField { index, field: "name" })?;
        let open = def
            .open
            .as_deref()
            .ok_or(RuleError::MissingField { index, field: "open" })?;
        let close = def
            .close
            .as_deref()
            .ok_or(RuleError::MissingField { index, field: "close" })?;

        Ok(Self {
            open: compile(&name, "open", open)?,
            close: compile(&name, "close", close)?,
            hooks: RuleHooks::resolve(
                &name,
                def.validate.as_deref(),
                def.compare.as_deref(),
                def.post_match.as_deref(),
                registry,
            )?,
            sub_search: sub_search_mode(&name, def.find_in_sub_search.as_ref())?,
            style: def.style.clone().unwrap_or_else(|| DEFAULT_STYLE.to_string()),
            scope_exclude: def.scope_exclude.clone(),
            scope_exclude_exceptions: def.scope_exclude_exceptions.clone(),
            ignore_string_escape: def.ignore_string_escape,
            name,
        })
    }

    /// Pattern source of one side.
    pub fn source(&self, side: BracketSide) -> &str {
        match side {
            BracketSide::Open => self.open.as_str(),
            BracketSide::Close => self.close.as_str(),
        }
    }

    pub(crate) fn has_group(&self, side: BracketSide) -> bool {
        match side {
            BracketSide::Open => self.open.captures_len() > 1,
            BracketSide::Close => self.close.captures_len() > 1,
        }
    }

    pub fn hooks(&self) -> &RuleHooks {
        &self.hooks
    }
}

/// A delimiter rule applied to the edges of a scope extent.
#[derive(Debug, Clone)]
pub struct ScopeRule {
    pub name: String,
    pub style: String,
    /// Anchored to the start of the extent
    open: Regex,
    /// Anchored to the end of the extent
    close: Regex,
    pub(crate) hooks: RuleHooks,
    pub sub_search: SubSearch,
    pub scopes: Vec<String>,
}

impl ScopeRule {
    pub fn from_definition(
        index: usize,
        def: &ScopeDefinition,
        registry: &HookRegistry,
    ) -> Result<Self, RuleError> {
        let name = def
            .name
            .clone()
            .ok_or(RuleError::MissingField { index, field: "name" })?;
        if def.scopes.is_empty() {
            return Err(RuleError::MissingField {
                index,
                field: "scopes",
            });
        }
        let open = def.open.as_deref().unwrap_or(".");
        let close = def.close.as_deref().unwrap_or(".");

        Ok(Self {
            open: compile(&name, "open", &format!(r"\A(?:{open})"))?,
            close: compile(&name, "close", &format!(r"(?:{close})\z"))?,
            hooks: RuleHooks::resolve(
                &name,
                def.validate.as_deref(),
                def.compare.as_deref(),
                def.post_match.as_deref(),
                registry,
            )?,
            sub_search: sub_search_mode(&name, def.sub_bracket_search.as_ref())?,
            style: def.style.clone().unwrap_or_else(|| DEFAULT_STYLE.to_string()),
            scopes: def.scopes.clone(),
            name,
        })
    }

    /// Span of the open token at the start of `extent`, relative to it.
    pub(crate) fn find_open(&self, extent: &str) -> Option<(usize, usize)> {
        edge_token(&self.open, extent)
    }

    /// Span of the close token at the end of `extent`, relative to it.
    pub(crate) fn find_close(&self, extent: &str) -> Option<(usize, usize)> {
        edge_token(&self.close, extent)
    }

    pub fn hooks(&self) -> &RuleHooks {
        &self.hooks
    }
}

fn edge_token(pattern: &Regex, extent: &str) -> Option<(usize, usize)> {
    let caps = pattern.captures(extent)?;
    let span = if pattern.captures_len() > 1 {
        caps.get(1)?
    } else {
        caps.get(0)?
    };
    (!span.is_empty()).then(|| (span.start(), span.end()))
}

/// Scope rules sharing one scope name, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeGroup {
    pub name: String,
    /// Indices into the scope rules of the set
    pub rules: Vec<usize>,
}

/// What the matcher needs to know about the rule behind a token.
pub(crate) struct RuleRef<'a> {
    pub name: &'a str,
    pub style: &'a str,
    pub hooks: &'a RuleHooks,
}

/// The compiled rules for one language.
#[derive(Debug, Clone)]
pub struct RuleSet {
    language: String,
    brackets: Vec<BracketRule>,
    scope_rules: Vec<ScopeRule>,
    scope_groups: Vec<ScopeGroup>,
    full_pattern: Option<TokenPattern>,
    sub_pattern: Option<TokenPattern>,
    hooks: HookPresence,
    diagnostics: Vec<RuleError>,
}

impl RuleSet {
    /// Builds the rules of `definitions` that apply to `language`.
    ///
    /// Definitions that fail to compile are skipped; see
    /// [`diagnostics`](Self::diagnostics).
    pub fn build(language: &str, definitions: &RuleDefinitions, registry: &HookRegistry) -> Self {
        let mut set = Self {
            language: language.to_string(),
            brackets: Vec::new(),
            scope_rules: Vec::new(),
            scope_groups: Vec::new(),
            full_pattern: None,
            sub_pattern: None,
            hooks: HookPresence::default(),
            diagnostics: Vec::new(),
        };

        for (index, def) in definitions.brackets.iter().enumerate() {
            if !def.applies_to(language) {
                continue;
            }
            let checked = BracketRule::from_definition(index, def, registry)
                .and_then(|rule| set.fits_alternation(&rule).map(|()| rule));
            match checked {
                Ok(rule) => {
                    set.hooks.merge(rule.hooks.present());
                    set.brackets.push(rule);
                }
                Err(e) => set.reject(e),
            }
        }

        for (index, def) in definitions.scope_brackets.iter().enumerate() {
            if !def.applies_to(language) {
                continue;
            }
            match ScopeRule::from_definition(index, def, registry) {
                Ok(rule) => {
                    set.hooks.merge(rule.hooks.present());
                    set.add_scope_rule(rule);
                }
                Err(e) => set.reject(e),
            }
        }

        set.full_pattern = set.compile_pattern("full", |rule| rule.sub_search.in_full_search());
        set.sub_pattern = set.compile_pattern("sub-search", |rule| rule.sub_search.in_sub_search());

        tracing::debug!(
            language,
            brackets = set.brackets.len(),
            scope_rules = set.scope_rules.len(),
            skipped = set.diagnostics.len(),
            "Built rule set"
        );
        set
    }

    fn reject(&mut self, error: RuleError) {
        tracing::warn!(language = %self.language, "Skipping rule: {}", error);
        self.diagnostics.push(error);
    }

    fn add_scope_rule(&mut self, rule: ScopeRule) {
        let index = self.scope_rules.len();
        for scope in &rule.scopes {
            match self.scope_groups.iter_mut().find(|g| &g.name == scope) {
                Some(group) => group.rules.push(index),
                None => self.scope_groups.push(ScopeGroup {
                    name: scope.clone(),
                    rules: vec![index],
                }),
            }
        }
        self.scope_rules.push(rule);
    }

    /// Checks that `candidate` still compiles alongside the rules accepted so
    /// far, in every search mode it takes part in.
    fn fits_alternation(&self, candidate: &BracketRule) -> Result<(), RuleError> {
        let modes: [(&'static str, fn(&BracketRule) -> bool); 2] = [
            ("full", |r| r.sub_search.in_full_search()),
            ("sub-search", |r| r.sub_search.in_sub_search()),
        ];
        for (mode, eligible) in modes {
            if !eligible(candidate) {
                continue;
            }
            let rules = self
                .brackets
                .iter()
                .chain(std::iter::once(candidate))
                .enumerate()
                .filter(|(_, r)| eligible(r));
            TokenPattern::compile(rules).map_err(|source| RuleError::Combined {
                rule: candidate.name.clone(),
                mode,
                source,
            })?;
        }
        Ok(())
    }

    fn compile_pattern(
        &mut self,
        mode: &'static str,
        eligible: impl Fn(&BracketRule) -> bool,
    ) -> Option<TokenPattern> {
        let rules = self.brackets.iter().enumerate().filter(|(_, r)| eligible(r));
        match TokenPattern::compile(rules) {
            Ok(pattern) => {
                if let Some(p) = &pattern {
                    tracing::debug!(mode, pattern = p.as_str(), "Compiled token pattern");
                }
                pattern
            }
            Err(source) => {
                let rule = self.brackets.last().map(|r| r.name.clone()).unwrap_or_default();
                self.reject(RuleError::Combined { rule, mode, source });
                None
            }
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn brackets(&self) -> &[BracketRule] {
        &self.brackets
    }

    pub fn scope_rules(&self) -> &[ScopeRule] {
        &self.scope_rules
    }

    pub fn scope_groups(&self) -> &[ScopeGroup] {
        &self.scope_groups
    }

    /// Which hook kinds any rule of the set defines.
    pub fn hook_presence(&self) -> HookPresence {
        self.hooks
    }

    /// Errors of the definitions that were skipped.
    pub fn diagnostics(&self) -> &[RuleError] {
        &self.diagnostics
    }

    /// Returns true if the set has nothing to match with.
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty() && self.scope_rules.is_empty()
    }

    pub(crate) fn full_pattern(&self) -> Option<&TokenPattern> {
        self.full_pattern.as_ref()
    }

    pub(crate) fn sub_pattern(&self) -> Option<&TokenPattern> {
        self.sub_pattern.as_ref()
    }

    pub(crate) fn rule_ref(&self, token: &Token) -> RuleRef<'_> {
        match token.group {
            Some(_) => {
                let rule = &self.scope_rules[token.rule];
                RuleRef {
                    name: &rule.name,
                    style: &rule.style,
                    hooks: &rule.hooks,
                }
            }
            None => {
                let rule = &self.brackets[token.rule];
                RuleRef {
                    name: &rule.name,
                    style: &rule.style,
                    hooks: &rule.hooks,
                }
            }
        }
    }
}
