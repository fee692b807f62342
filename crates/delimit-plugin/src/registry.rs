//! Named hook lookup.
//!
//! Rule definitions refer to hooks by name. The registry resolves those
//! names when a rule set is built; an unknown name fails that one rule.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtin::{SelectContent, TagComparator};
use crate::{Comparator, HookError, PostMatcher, Transform, Validator};

/// The four kinds of hook a name can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Validate,
    Compare,
    PostMatch,
    Transform,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Validate => "validate",
            HookKind::Compare => "compare",
            HookKind::PostMatch => "post_match",
            HookKind::Transform => "transform",
        };
        f.write_str(name)
    }
}

/// Hooks available to rule definitions, by name.
#[derive(Clone, Default)]
pub struct HookRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
    comparators: HashMap<String, Arc<dyn Comparator>>,
    post_matchers: HashMap<String, Arc<dyn PostMatcher>>,
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl HookRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the hooks that ship with the crate.
    ///
    /// - `tags` (compare): pairs `<name` with `</name`
    /// - `select` (transform): selects the content between a pair
    /// - `select_with_brackets` (transform): selects the pair and its content
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_comparator("tags", TagComparator)
            .register_transform("select", SelectContent::default())
            .register_transform(
                "select_with_brackets",
                SelectContent {
                    include_delimiters: true,
                },
            );
        registry
    }

    pub fn register_validator(
        &mut self,
        name: impl Into<String>,
        hook: impl Validator + 'static,
    ) -> &mut Self {
        self.validators.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn register_comparator(
        &mut self,
        name: impl Into<String>,
        hook: impl Comparator + 'static,
    ) -> &mut Self {
        self.comparators.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn register_post_matcher(
        &mut self,
        name: impl Into<String>,
        hook: impl PostMatcher + 'static,
    ) -> &mut Self {
        self.post_matchers.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn register_transform(
        &mut self,
        name: impl Into<String>,
        hook: impl Transform + 'static,
    ) -> &mut Self {
        self.transforms.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn validator(&self, name: &str) -> Result<Arc<dyn Validator>, HookError> {
        lookup(&self.validators, HookKind::Validate, name)
    }

    pub fn comparator(&self, name: &str) -> Result<Arc<dyn Comparator>, HookError> {
        lookup(&self.comparators, HookKind::Compare, name)
    }

    pub fn post_matcher(&self, name: &str) -> Result<Arc<dyn PostMatcher>, HookError> {
        lookup(&self.post_matchers, HookKind::PostMatch, name)
    }

    pub fn transform(&self, name: &str) -> Result<Arc<dyn Transform>, HookError> {
        lookup(&self.transforms, HookKind::Transform, name)
    }

    /// Registered names of one kind, sorted.
    pub fn names(&self, kind: HookKind) -> Vec<&str> {
        let mut names: Vec<&str> = match kind {
            HookKind::Validate => self.validators.keys().map(String::as_str).collect(),
            HookKind::Compare => self.comparators.keys().map(String::as_str).collect(),
            HookKind::PostMatch => self.post_matchers.keys().map(String::as_str).collect(),
            HookKind::Transform => self.transforms.keys().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names
    }
}

fn lookup<T: ?Sized>(
    hooks: &HashMap<String, Arc<T>>,
    kind: HookKind,
    name: &str,
) -> Result<Arc<T>, HookError> {
    hooks.get(name).cloned().ok_or_else(|| HookError::NotFound {
        kind,
        name: name.to_string(),
    })
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("validate", &self.names(HookKind::Validate))
            .field("compare", &self.names(HookKind::Compare))
            .field("post_match", &self.names(HookKind::PostMatch))
            .field("transform", &self.names(HookKind::Transform))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BracketSide;
    use delimit_buffer::Region;

    #[test]
    fn test_builtins_registered() {
        let registry = HookRegistry::with_builtins();
        assert_eq!(registry.names(HookKind::Compare), vec!["tags"]);
        assert_eq!(
            registry.names(HookKind::Transform),
            vec!["select", "select_with_brackets"]
        );
        assert!(registry.comparator("tags").is_ok());
    }

    #[test]
    fn test_unknown_hook() {
        let registry = HookRegistry::new();
        let err = registry.validator("missing").err().unwrap();
        assert!(matches!(
            err,
            HookError::NotFound {
                kind: HookKind::Validate,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Unknown validate hook: missing");
    }

    #[test]
    fn test_register_closure() {
        let mut registry = HookRegistry::new();
        registry.register_validator(
            "not_first",
            |_: &str, region: Region, _: BracketSide, _: &str| -> Result<bool, HookError> {
                Ok(region.begin() > 0)
            },
        );

        let hook = registry.validator("not_first").unwrap();
        assert!(!hook.validate("round", Region::new(0, 1), BracketSide::Open, "()").unwrap());
        assert!(hook.validate("round", Region::new(1, 2), BracketSide::Close, "()").unwrap());
    }
}
