//! Rule definitions as they appear in configuration.
//!
//! Definitions are plain data. Every field is optional at this level so a
//! single malformed entry can be reported and skipped when the rule set is
//! built, instead of failing the whole configuration file.

use serde::{Deserialize, Serialize};

/// How `language_list` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFilter {
    /// Apply everywhere except the listed languages
    #[default]
    Blacklist,
    /// Apply only to the listed languages
    Whitelist,
}

/// Whether a rule takes part in the nested search inside a scope match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "SubSearchValue")]
pub enum SubSearch {
    #[default]
    Never,
    /// Both in the full search and in sub-searches
    Also,
    /// Only in sub-searches
    Only,
}

impl SubSearch {
    /// Returns true if the rule is looked for inside scope matches.
    pub fn in_sub_search(self) -> bool {
        !matches!(self, SubSearch::Never)
    }

    /// Returns true if the rule is looked for outside scope matches.
    pub fn in_full_search(self) -> bool {
        !matches!(self, SubSearch::Only)
    }
}

/// Raw `find_in_sub_search` / `sub_bracket_search` value: a bool or `"only"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubSearchValue {
    Flag(bool),
    Mode(String),
}

impl SubSearchValue {
    /// Interprets the value, returning the offending text when it is not
    /// one of `true`, `false`, `"true"`, `"false"` or `"only"`.
    pub fn parse(&self) -> Result<SubSearch, String> {
        match self {
            SubSearchValue::Flag(false) => Ok(SubSearch::Never),
            SubSearchValue::Flag(true) => Ok(SubSearch::Also),
            SubSearchValue::Mode(mode) => match mode.to_ascii_lowercase().as_str() {
                "false" => Ok(SubSearch::Never),
                "true" => Ok(SubSearch::Also),
                "only" => Ok(SubSearch::Only),
                _ => Err(mode.clone()),
            },
        }
    }
}

impl From<SubSearch> for SubSearchValue {
    fn from(mode: SubSearch) -> Self {
        match mode {
            SubSearch::Never => SubSearchValue::Flag(false),
            SubSearch::Also => SubSearchValue::Flag(true),
            SubSearch::Only => SubSearchValue::Mode("only".to_string()),
        }
    }
}

fn applies_to(enabled: bool, filter: LanguageFilter, list: &[String], language: &str) -> bool {
    if !enabled {
        return false;
    }
    let listed = list.iter().any(|l| l.eq_ignore_ascii_case(language));
    match filter {
        LanguageFilter::Blacklist => !listed,
        LanguageFilter::Whitelist => listed,
    }
}

fn default_enabled() -> bool {
    true
}

/// A literal bracket rule as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_match: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope_exclude_exceptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find_in_sub_search: Option<SubSearchValue>,
    #[serde(default)]
    pub ignore_string_escape: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub language_filter: LanguageFilter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language_list: Vec<String>,
}

impl BracketDefinition {
    /// A universal rule pairing `open` with `close`.
    pub fn new(name: impl Into<String>, open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            open: Some(open.into()),
            close: Some(close.into()),
            style: None,
            compare: None,
            validate: None,
            post_match: None,
            scope_exclude: Vec::new(),
            scope_exclude_exceptions: Vec::new(),
            find_in_sub_search: None,
            ignore_string_escape: false,
            enabled: true,
            language_filter: LanguageFilter::default(),
            language_list: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_compare(mut self, hook: impl Into<String>) -> Self {
        self.compare = Some(hook.into());
        self
    }

    pub fn with_validate(mut self, hook: impl Into<String>) -> Self {
        self.validate = Some(hook.into());
        self
    }

    pub fn with_post_match(mut self, hook: impl Into<String>) -> Self {
        self.post_match = Some(hook.into());
        self
    }

    pub fn with_sub_search(mut self, mode: SubSearch) -> Self {
        self.find_in_sub_search = Some(mode.into());
        self
    }

    /// Treat backslash-escaped tokens as illegal.
    pub fn escape_sensitive(mut self) -> Self {
        self.ignore_string_escape = true;
        self
    }

    /// Suppress the rule where `selector` matches.
    pub fn excluding(mut self, selector: impl Into<String>) -> Self {
        self.scope_exclude.push(selector.into());
        self
    }

    /// Re-enable the rule where `selector` matches despite an exclusion.
    pub fn except_in(mut self, selector: impl Into<String>) -> Self {
        self.scope_exclude_exceptions.push(selector.into());
        self
    }

    pub fn for_languages<I, S>(mut self, filter: LanguageFilter, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_filter = filter;
        self.language_list = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the rule is active for `language`.
    pub fn applies_to(&self, language: &str) -> bool {
        applies_to(self.enabled, self.language_filter, &self.language_list, language)
    }
}

/// A scope rule as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_match: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_bracket_search: Option<SubSearchValue>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub language_filter: LanguageFilter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language_list: Vec<String>,
}

impl ScopeDefinition {
    /// A universal rule delimiting `scopes` with `open` and `close`.
    pub fn new<I, S>(name: impl Into<String>, scopes: I, open: impl Into<String>, close: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Some(name.into()),
            open: Some(open.into()),
            close: Some(close.into()),
            style: None,
            compare: None,
            validate: None,
            post_match: None,
            scopes: scopes.into_iter().map(Into::into).collect(),
            sub_bracket_search: None,
            enabled: true,
            language_filter: LanguageFilter::default(),
            language_list: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_compare(mut self, hook: impl Into<String>) -> Self {
        self.compare = Some(hook.into());
        self
    }

    pub fn with_validate(mut self, hook: impl Into<String>) -> Self {
        self.validate = Some(hook.into());
        self
    }

    pub fn with_post_match(mut self, hook: impl Into<String>) -> Self {
        self.post_match = Some(hook.into());
        self
    }

    pub fn with_sub_search(mut self, mode: SubSearch) -> Self {
        self.sub_bracket_search = Some(mode.into());
        self
    }

    pub fn for_languages<I, S>(mut self, filter: LanguageFilter, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_filter = filter;
        self.language_list = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the rule is active for `language`.
    pub fn applies_to(&self, language: &str) -> bool {
        applies_to(self.enabled, self.language_filter, &self.language_list, language)
    }
}

/// The ordered rule definitions a rule set is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinitions {
    #[serde(default)]
    pub brackets: Vec<BracketDefinition>,
    #[serde(default)]
    pub scope_brackets: Vec<ScopeDefinition>,
}

impl RuleDefinitions {
    pub fn new(brackets: Vec<BracketDefinition>, scope_brackets: Vec<ScopeDefinition>) -> Self {
        Self {
            brackets,
            scope_brackets,
        }
    }
}
