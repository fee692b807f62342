//! Per-language rule set cache.
//!
//! ## Learning: Swap-on-Write Sharing
//!
//! Rule sets are immutable and handed out as `Arc<RuleSet>`. A pass keeps
//! its `Arc` for as long as it runs, so [`RuleRegistry::reconfigure`] can
//! replace the definitions and drop the cache without ever touching a set
//! that is in use: old passes finish on the old set, new passes build from
//! the new definitions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use delimit_plugin::HookRegistry;

use crate::definition::RuleDefinitions;
use crate::rules::RuleSet;

#[derive(Debug)]
struct State {
    definitions: Arc<RuleDefinitions>,
    hooks: Arc<HookRegistry>,
    sets: HashMap<String, Arc<RuleSet>>,
    /// Bumped on every reconfiguration
    generation: u64,
}

/// Builds and caches one [`RuleSet`] per language.
#[derive(Debug)]
pub struct RuleRegistry {
    state: RwLock<State>,
}

impl RuleRegistry {
    pub fn new(definitions: RuleDefinitions, hooks: HookRegistry) -> Self {
        Self {
            state: RwLock::new(State {
                definitions: Arc::new(definitions),
                hooks: Arc::new(hooks),
                sets: HashMap::new(),
                generation: 0,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The rule set for `language`, built on first use.
    ///
    /// Language names are compared case-insensitively.
    pub fn rules_for(&self, language: &str) -> Arc<RuleSet> {
        let key = language.to_lowercase();
        let (definitions, hooks, generation) = {
            let state = self.read();
            if let Some(set) = state.sets.get(&key) {
                return Arc::clone(set);
            }
            (
                Arc::clone(&state.definitions),
                Arc::clone(&state.hooks),
                state.generation,
            )
        };

        // Built outside the lock: compiling patterns can take a while.
        let built = Arc::new(RuleSet::build(&key, &definitions, &hooks));

        let mut state = self.write();
        if state.generation != generation {
            // Reconfigured meanwhile; hand out the set without caching it.
            return built;
        }
        Arc::clone(state.sets.entry(key).or_insert(built))
    }

    /// Replaces the definitions and drops every cached rule set.
    pub fn reconfigure(&self, definitions: RuleDefinitions) {
        let mut state = self.write();
        state.definitions = Arc::new(definitions);
        state.sets.clear();
        state.generation += 1;
        tracing::debug!(generation = state.generation, "Rule definitions replaced");
    }

    /// Replaces the hooks and drops every cached rule set.
    pub fn set_hooks(&self, hooks: HookRegistry) {
        let mut state = self.write();
        state.hooks = Arc::new(hooks);
        state.sets.clear();
        state.generation += 1;
    }

    /// Languages with a cached rule set, sorted.
    pub fn cached_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.read().sets.keys().cloned().collect();
        languages.sort_unstable();
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{BracketDefinition, LanguageFilter};

    fn definitions() -> RuleDefinitions {
        RuleDefinitions::new(
            vec![
                BracketDefinition::new("round", r"(\()", r"(\))"),
                BracketDefinition::new("angle", "(<)", "(>)")
                    .for_languages(LanguageFilter::Whitelist, ["rust"]),
            ],
            vec![],
        )
    }

    #[test]
    fn test_sets_are_cached() {
        let registry = RuleRegistry::new(definitions(), HookRegistry::new());
        let a = registry.rules_for("Rust");
        let b = registry.rules_for("rust");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.brackets().len(), 2);

        let plain = registry.rules_for("plain text");
        assert_eq!(plain.brackets().len(), 1);
        assert_eq!(registry.cached_languages(), vec!["plain text", "rust"]);
    }

    #[test]
    fn test_reconfigure_swaps_sets() {
        let registry = RuleRegistry::new(definitions(), HookRegistry::new());
        let old = registry.rules_for("rust");

        registry.reconfigure(RuleDefinitions::new(
            vec![BracketDefinition::new("square", r"(\[)", r"(\])")],
            vec![],
        ));
        assert!(registry.cached_languages().is_empty());

        let new = registry.rules_for("rust");
        assert!(!Arc::ptr_eq(&old, &new));
        // The old set is untouched for whoever still holds it.
        assert_eq!(old.brackets()[0].name, "round");
        assert_eq!(new.brackets()[0].name, "square");
    }

    #[test]
    fn test_shared_across_threads() {
        let registry = Arc::new(RuleRegistry::new(definitions(), HookRegistry::new()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.rules_for("rust").brackets().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
