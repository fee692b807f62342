//! Scope classification.
//!
//! Editors classify text into dotted scope names (`string.quoted.double`,
//! `comment.line`). The matcher only needs two questions answered: does an
//! offset satisfy a selector, and what contiguous run of one classification
//! contains an offset. `ScopeMap` answers both from a flat list of runs and
//! is what the command-line front end and the tests feed the matcher.

use serde::{Deserialize, Serialize};

use crate::{BufferError, BufferResult, Region};

/// One classified run of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRun {
    /// First byte of the run
    pub begin: usize,
    /// One past the last byte of the run
    pub end: usize,
    /// Dotted scope name
    pub scope: String,
}

/// Runs of scope classification over a buffer.
///
/// Runs may nest (a `constant.character.escape` inside a `string`) and one
/// logical region may be reported as several adjacent runs.
#[derive(Debug, Clone, Default)]
pub struct ScopeMap {
    /// Sorted outermost-first: by `begin`, then longest first
    runs: Vec<ScopeRun>,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from runs in any order.
    pub fn from_runs(runs: impl IntoIterator<Item = ScopeRun>) -> BufferResult<Self> {
        let mut map = Self::new();
        for run in runs {
            map.insert(run)?;
        }
        Ok(map)
    }

    /// Adds a run of `scope` covering `begin..end`.
    pub fn push(&mut self, begin: usize, end: usize, scope: impl Into<String>) -> BufferResult<()> {
        self.insert(ScopeRun {
            begin,
            end,
            scope: scope.into(),
        })
    }

    fn insert(&mut self, run: ScopeRun) -> BufferResult<()> {
        if run.begin >= run.end {
            return Err(BufferError::InvalidRegion {
                begin: run.begin,
                end: run.end,
            });
        }
        let idx = self
            .runs
            .partition_point(|r| (r.begin, std::cmp::Reverse(r.end)) <= (run.begin, std::cmp::Reverse(run.end)));
        self.runs.insert(idx, run);
        Ok(())
    }

    /// Returns true if no run was added.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Scope names covering `offset`, outermost first.
    pub fn scopes_at(&self, offset: usize) -> Vec<&str> {
        self.runs
            .iter()
            .take_while(|r| r.begin <= offset)
            .filter(|r| offset < r.end)
            .map(|r| r.scope.as_str())
            .collect()
    }

    /// Returns true if the classification at `offset` satisfies `selector`.
    pub fn matches(&self, offset: usize, selector: &str) -> bool {
        selector_matches(&self.scopes_at(offset), selector)
    }

    /// The innermost run containing `offset`.
    pub fn extract(&self, offset: usize) -> Option<Region> {
        self.runs
            .iter()
            .take_while(|r| r.begin <= offset)
            .filter(|r| offset < r.end)
            .last()
            .map(|r| Region::new(r.begin, r.end))
    }
}

/// Tests a scope stack (outermost first) against a selector.
///
/// Selector syntax: comma separates alternatives (OR); within one
/// alternative, whitespace separates scope prefixes that must appear in
/// that order in the stack. A prefix matches a scope at a dot boundary, so
/// `string` matches `string.quoted` but not `stringy`.
pub fn selector_matches(scopes: &[&str], selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .any(|alt| {
            let mut remaining = scopes.iter();
            alt.split_whitespace()
                .all(|part| remaining.any(|scope| has_scope_prefix(scope, part)))
        })
}

fn has_scope_prefix(scope: &str, prefix: &str) -> bool {
    match scope.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScopeMap {
        // source [0, 20), string [4, 12) split in two runs, escape [6, 8)
        let mut map = ScopeMap::new();
        map.push(0, 20, "source.rust").unwrap();
        map.push(4, 9, "string.quoted.double").unwrap();
        map.push(9, 12, "string.quoted.double").unwrap();
        map.push(6, 8, "constant.character.escape").unwrap();
        map
    }

    #[test]
    fn test_scopes_at() {
        let map = sample();
        assert_eq!(map.scopes_at(2), vec!["source.rust"]);
        assert_eq!(
            map.scopes_at(6),
            vec!["source.rust", "string.quoted.double", "constant.character.escape"]
        );
        assert!(map.scopes_at(25).is_empty());
    }

    #[test]
    fn test_selector_prefixes() {
        let map = sample();
        assert!(map.matches(5, "string"));
        assert!(map.matches(5, "string.quoted"));
        assert!(!map.matches(5, "string.quoted.single"));
        assert!(!map.matches(2, "string"));
        assert!(map.matches(2, "comment, source"));
        assert!(map.matches(6, "source string constant"));
        assert!(!map.matches(6, "string source"));
        assert!(!map.matches(6, ""));
    }

    #[test]
    fn test_prefix_needs_dot_boundary() {
        assert!(!selector_matches(&["stringy"], "string"));
        assert!(selector_matches(&["string"], "string"));
    }

    #[test]
    fn test_extract_innermost_run() {
        let map = sample();
        assert_eq!(map.extract(5), Some(Region::new(4, 9)));
        assert_eq!(map.extract(7), Some(Region::new(6, 8)));
        assert_eq!(map.extract(10), Some(Region::new(9, 12)));
        assert_eq!(map.extract(30), None);
    }

    #[test]
    fn test_empty_run_rejected() {
        let mut map = ScopeMap::new();
        assert!(map.push(3, 3, "string").is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_runs_from_json() {
        let runs: Vec<ScopeRun> =
            serde_json::from_str(r#"[{"begin": 1, "end": 4, "scope": "string"}]"#).unwrap();
        let map = ScopeMap::from_runs(runs).unwrap();
        assert_eq!(map.extract(2), Some(Region::new(1, 4)));
    }
}
