//! Per-rule hook traits.

use std::ops::Range;

use delimit_buffer::Region;
use serde::{Deserialize, Serialize};

use crate::HookError;

/// Which side of a pair a token sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketSide {
    Open,
    Close,
}

impl BracketSide {
    /// Index usable for `[T; 2]` tables keyed by side.
    pub fn index(self) -> usize {
        match self {
            BracketSide::Open => 0,
            BracketSide::Close => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BracketSide::Open => BracketSide::Close,
            BracketSide::Close => BracketSide::Open,
        }
    }
}

/// Vetoes individual candidate tokens.
pub trait Validator: Send + Sync {
    /// Returns `Ok(false)` to drop the candidate at `region`.
    fn validate(
        &self,
        name: &str,
        region: Region,
        side: BracketSide,
        text: &str,
    ) -> Result<bool, HookError>;
}

impl<F> Validator for F
where
    F: Fn(&str, Region, BracketSide, &str) -> Result<bool, HookError> + Send + Sync,
{
    fn validate(
        &self,
        name: &str,
        region: Region,
        side: BracketSide,
        text: &str,
    ) -> Result<bool, HookError> {
        self(name, region, side, text)
    }
}

/// Decides whether an open and a close token of the same rule correspond.
///
/// Only consulted once the rule-level check already passed.
pub trait Comparator: Send + Sync {
    fn compare(
        &self,
        name: &str,
        open: Region,
        close: Region,
        text: &str,
    ) -> Result<bool, HookError>;
}

impl<F> Comparator for F
where
    F: Fn(&str, Region, Region, &str) -> Result<bool, HookError> + Send + Sync,
{
    fn compare(
        &self,
        name: &str,
        open: Region,
        close: Region,
        text: &str,
    ) -> Result<bool, HookError> {
        self(name, open, close, text)
    }
}

/// Everything a post-matcher sees about a resolved pair.
#[derive(Debug, Clone)]
pub struct PostMatchInput<'a> {
    /// Rule name
    pub name: &'a str,
    /// Style the rule was configured with
    pub style: &'a str,
    pub left: Option<Region>,
    pub right: Option<Region>,
    /// Cursor offset the pass started from
    pub center: usize,
    /// Whole buffer text
    pub text: &'a str,
    /// Search window of this pass
    pub window: Range<usize>,
}

/// A post-matcher's rewrite of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMatchOutput {
    pub left: Option<Region>,
    pub right: Option<Region>,
    pub style: String,
}

impl PostMatchOutput {
    /// The input passed through untouched.
    pub fn unchanged(input: &PostMatchInput<'_>) -> Self {
        Self {
            left: input.left,
            right: input.right,
            style: input.style.to_string(),
        }
    }
}

/// Rewrites a resolved pair (offsets, sides, style).
pub trait PostMatcher: Send + Sync {
    fn post_match(&self, input: &PostMatchInput<'_>) -> Result<PostMatchOutput, HookError>;
}

impl<F> PostMatcher for F
where
    F: Fn(&PostMatchInput<'_>) -> Result<PostMatchOutput, HookError> + Send + Sync,
{
    fn post_match(&self, input: &PostMatchInput<'_>) -> Result<PostMatchOutput, HookError> {
        self(input)
    }
}

/// Accepts every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl Validator for NoValidation {
    fn validate(&self, _: &str, _: Region, _: BracketSide, _: &str) -> Result<bool, HookError> {
        Ok(true)
    }
}

/// Leaves the rule-level comparison as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComparison;

impl Comparator for NoComparison {
    fn compare(&self, _: &str, _: Region, _: Region, _: &str) -> Result<bool, HookError> {
        Ok(true)
    }
}

/// Returns the pair unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPostMatch;

impl PostMatcher for NoPostMatch {
    fn post_match(&self, input: &PostMatchInput<'_>) -> Result<PostMatchOutput, HookError> {
        Ok(PostMatchOutput::unchanged(input))
    }
}
