//! Per-cursor matching passes.
//!
//! ## Learning: Explicit State Machines
//!
//! A pass can bounce between the scope matcher and the bracket matcher: a
//! scope match may start a nested bracket search, and an outside-adjacent
//! bracket search may ask for one more scope check. Rather than letting
//! those calls recurse into each other, [`MatchSession`] steps through a
//! `Phase` enum. The scope check is retried at most once, and a
//! sub-search never leads back into a scope check, so every pass ends.

use delimit_buffer::{BufferView, Region};
use delimit_plugin::TransformPipeline;
use serde::Serialize;

use crate::bracket::match_brackets;
use crate::config::MatchOptions;
use crate::context::{MatchContext, Pair};
use crate::definition::SubSearch;
use crate::rules::RuleSet;
use crate::scan::{BracketSearch, Direction};
use crate::scope::{ScopeCandidate, match_scopes};
use crate::token::{SearchWindow, Token};

/// How a cursor's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Both sides found
    Matched,
    /// One side of a scope pair found
    Partial,
    /// No pair encloses the cursor
    NoMatch,
    /// A transform dropped the pair; the plain selection stays
    Vetoed,
    /// The cursor was not attempted
    Skipped,
}

/// Which matcher produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Bracket,
    Scope,
    SubSearch,
}

/// The result of matching one cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub cursor: Region,
    pub outcome: MatchOutcome,
    pub left: Option<Token>,
    pub right: Option<Token>,
    /// Lone literal bracket with no counterpart
    pub unmatched: Option<Token>,
    pub style: Option<String>,
    /// Output selection
    pub regions: Vec<Region>,
    pub source: Option<MatchSource>,
}

impl MatchResult {
    fn empty(cursor: Region, outcome: MatchOutcome) -> Self {
        Self {
            cursor,
            outcome,
            left: None,
            right: None,
            unmatched: None,
            style: None,
            regions: vec![cursor],
            source: None,
        }
    }

    pub fn no_match(cursor: Region) -> Self {
        Self::empty(cursor, MatchOutcome::NoMatch)
    }

    pub fn skipped(cursor: Region) -> Self {
        Self::empty(cursor, MatchOutcome::Skipped)
    }

    pub fn is_match(&self) -> bool {
        self.outcome == MatchOutcome::Matched
    }

    pub fn is_partial(&self) -> bool {
        self.outcome == MatchOutcome::Partial
    }

    /// Regions of both sides, when both were found.
    pub fn pair(&self) -> Option<(Region, Region)> {
        Some((self.left?.region(), self.right?.region()))
    }
}

/// Steps of one pass.
#[derive(Debug)]
enum Phase {
    ScopeCheck(Direction),
    SubSearch(ScopeCandidate),
    BracketCheck,
    Done(MatchResult),
}

/// Matches cursors against one rule set.
#[derive(Debug, Clone)]
pub struct MatchSession<'a> {
    rules: &'a RuleSet,
    options: MatchOptions,
    transforms: Option<&'a TransformPipeline>,
}

impl<'a> MatchSession<'a> {
    pub fn new(rules: &'a RuleSet, options: MatchOptions) -> Self {
        Self {
            rules,
            options,
            transforms: None,
        }
    }

    /// Runs `pipeline` on every winning pair.
    pub fn with_transforms(mut self, pipeline: &'a TransformPipeline) -> Self {
        self.transforms = Some(pipeline);
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Matches a single cursor.
    pub fn match_cursor<B>(&self, view: &B, cursor: impl Into<Region>) -> MatchResult
    where
        B: BufferView + ?Sized,
    {
        let text = view.read_text(0..view.len());
        self.run(view, &text, cursor.into())
    }

    /// Matches every cursor, in order.
    ///
    /// A pass with `max_selections` cursors or more is abandoned, and
    /// cursors past `selection_limit` are skipped.
    pub fn match_selections<B>(&self, view: &B, cursors: &[Region]) -> Vec<MatchResult>
    where
        B: BufferView + ?Sized,
    {
        if self
            .options
            .max_selections
            .is_some_and(|max| cursors.len() >= max)
        {
            tracing::debug!(cursors = cursors.len(), "Too many cursors, skipping pass");
            return cursors.iter().map(|&c| MatchResult::skipped(c)).collect();
        }

        let text = view.read_text(0..view.len());
        cursors
            .iter()
            .enumerate()
            .map(|(i, &cursor)| match self.options.selection_limit {
                Some(limit) if i >= limit => MatchResult::skipped(cursor),
                _ => self.run(view, &text, cursor),
            })
            .collect()
    }

    fn run<B>(&self, view: &B, text: &str, cursor: Region) -> MatchResult
    where
        B: BufferView + ?Sized,
    {
        let center = cursor.a.min(text.len());
        if text.is_empty() || self.rules.is_empty() {
            return MatchResult::no_match(cursor);
        }
        let window = SearchWindow::around(center, text.len(), self.options.search_threshold)
            .snapped(text);
        if window.is_empty() {
            return MatchResult::no_match(cursor);
        }

        let ctx = MatchContext {
            rules: self.rules,
            view,
            text,
            options: &self.options,
            window,
            center,
        };
        let mut search: Option<BracketSearch> = None;
        let mut scope_retried = false;
        let mut phase = Phase::ScopeCheck(Direction::Left);

        loop {
            tracing::trace!(center, ?phase, "Match phase");
            phase = match phase {
                Phase::ScopeCheck(direction) => match match_scopes(&ctx, direction) {
                    Some(candidate)
                        if candidate.is_full()
                            && self.scope_sub_search(&candidate).in_sub_search() =>
                    {
                        Phase::SubSearch(candidate)
                    }
                    Some(candidate) => self
                        .finish_scope(&ctx, &candidate, cursor)
                        .map_or(Phase::BracketCheck, Phase::Done),
                    None => Phase::BracketCheck,
                },

                Phase::SubSearch(candidate) => {
                    if let Some(result) = self.sub_search(&ctx, &candidate, cursor) {
                        Phase::Done(result)
                    } else if self.scope_sub_search(&candidate) == SubSearch::Only {
                        Phase::BracketCheck
                    } else {
                        self.finish_scope(&ctx, &candidate, cursor)
                            .map_or(Phase::BracketCheck, Phase::Done)
                    }
                }

                Phase::BracketCheck => {
                    let Some(pattern) = self.rules.full_pattern() else {
                        return MatchResult::no_match(cursor);
                    };
                    let search = search.get_or_insert_with(|| {
                        BracketSearch::new(
                            text,
                            window,
                            center,
                            pattern,
                            self.options.outside_adjacent,
                            |token| ctx.is_illegal(token, None),
                        )
                    });
                    if self.options.outside_adjacent && !search.touches_right() && !scope_retried {
                        scope_retried = true;
                        Phase::ScopeCheck(Direction::Right)
                    } else {
                        let pair = match_brackets(&ctx, search);
                        let pair = ctx.post_match(ctx.adjacent_check(pair));
                        Phase::Done(self.conclude(&ctx, pair, cursor, MatchSource::Bracket))
                    }
                }

                Phase::Done(result) => {
                    tracing::debug!(center, outcome = ?result.outcome, source = ?result.source, "Cursor matched");
                    return result;
                }
            };
        }
    }

    fn scope_sub_search(&self, candidate: &ScopeCandidate) -> SubSearch {
        self.rules.scope_rules()[candidate.rule].sub_search
    }

    fn finish_scope<B>(
        &self,
        ctx: &MatchContext<'_, B>,
        candidate: &ScopeCandidate,
        cursor: Region,
    ) -> Option<MatchResult>
    where
        B: BufferView + ?Sized,
    {
        let pair = ctx.post_match(ctx.adjacent_check(candidate.pair()));
        if pair.is_empty() {
            return None;
        }
        Some(self.conclude(ctx, pair, cursor, MatchSource::Scope))
    }

    /// Searches for a literal pair inside a scope pair. Returns a result
    /// only when the nested search settles the pass.
    fn sub_search<B>(
        &self,
        ctx: &MatchContext<'_, B>,
        candidate: &ScopeCandidate,
        cursor: Region,
    ) -> Option<MatchResult>
    where
        B: BufferView + ?Sized,
    {
        let (Some(left), Some(right)) = (candidate.left, candidate.right) else {
            return None;
        };
        let pattern = self.rules.sub_pattern()?;
        let scope = self.rules.scope_groups()[candidate.group].name.as_str();
        let sub = ctx.within(SearchWindow {
            start: left.begin,
            end: right.end,
        });

        let mut search = BracketSearch::new(
            ctx.text,
            sub.window,
            ctx.center,
            pattern,
            self.options.outside_adjacent,
            |token| ctx.is_illegal(token, Some(scope)),
        );
        let pair = sub.post_match(sub.adjacent_check(match_brackets(&sub, &mut search)));
        if !pair.is_full() {
            return None;
        }

        let result = self.conclude(&sub, pair, cursor, MatchSource::SubSearch);
        match result.outcome {
            MatchOutcome::Matched | MatchOutcome::Vetoed => Some(result),
            _ => None,
        }
    }

    /// Runs the transforms on a full pair and classifies the outcome.
    fn conclude<B>(
        &self,
        ctx: &MatchContext<'_, B>,
        pair: Pair,
        cursor: Region,
        source: MatchSource,
    ) -> MatchResult
    where
        B: BufferView + ?Sized,
    {
        let mut regions = vec![cursor];
        let mut pair = pair;

        if let (Some(left), Some(right)) = (pair.left, pair.right) {
            if let Some(pipeline) = self.transforms.filter(|p| !p.is_empty()) {
                let name = self.rules.rule_ref(&left).name;
                let out = pipeline.run(name, left.region(), right.region(), regions, ctx.text);
                regions = out.regions;
                pair.left = out.left.map(|r| left.moved(r));
                pair.right = out.right.map(|r| right.moved(r));
                if out.no_bracket || pair.is_empty() {
                    return MatchResult {
                        regions,
                        source: Some(source),
                        ..MatchResult::empty(cursor, MatchOutcome::Vetoed)
                    };
                }
            }
        }

        let outcome = match (pair.is_full(), pair.is_empty(), source) {
            (true, _, _) => MatchOutcome::Matched,
            (_, true, _) => MatchOutcome::NoMatch,
            (_, _, MatchSource::Scope) => MatchOutcome::Partial,
            _ => MatchOutcome::NoMatch,
        };
        let source = (!pair.is_empty()).then_some(source);
        let (left, right, unmatched) = match outcome {
            MatchOutcome::NoMatch => (None, None, pair.left.or(pair.right)),
            _ => (pair.left, pair.right, None),
        };

        MatchResult {
            cursor,
            outcome,
            left,
            right,
            unmatched,
            style: pair.style,
            regions,
            source,
        }
    }
}

/// Matches one cursor of `view` with `rules`.
pub fn match_cursor<B>(
    view: &B,
    rules: &RuleSet,
    cursor: impl Into<Region>,
    options: &MatchOptions,
) -> MatchResult
where
    B: BufferView + ?Sized,
{
    MatchSession::new(rules, options.clone()).match_cursor(view, cursor)
}
