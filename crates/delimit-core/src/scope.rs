//! Delimiters found by scope classification instead of literal tokens.
//!
//! When the cursor sits inside a classified run such as a string, the run
//! itself is the pair: its first and last characters are checked against
//! the open and close patterns of the rules registered for that scope.

use delimit_buffer::{BufferView, Region};
use delimit_plugin::BracketSide;

use crate::context::{MatchContext, Pair};
use crate::scan::Direction;
use crate::token::Token;

/// A scope pair, before adjacency and post-match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScopeCandidate {
    pub left: Option<Token>,
    pub right: Option<Token>,
    /// Index of the winning scope group
    pub group: usize,
    /// Index of the winning scope rule
    pub rule: usize,
    /// Cursor position the containment check used
    pub adjusted_center: usize,
}

impl ScopeCandidate {
    pub fn is_full(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.left, self.right)
    }
}

/// Looks for a scope pair around the cursor.
///
/// `adjacent` picks the side an outside-adjacent cursor may borrow a scope
/// from: `Left` for a scope ending at the cursor, `Right` for one starting
/// there. Only used when outside-adjacent matching is on.
pub(crate) fn match_scopes<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    adjacent: Direction,
) -> Option<ScopeCandidate> {
    let outside = ctx.options.outside_adjacent;
    if ctx.center == 0 && !outside {
        return None;
    }

    let mut partial: Option<ScopeCandidate> = None;
    for (group_index, group) in ctx.rules.scope_groups().iter().enumerate() {
        let Some((probe, adjusted_center)) = locate(ctx, &group.name, adjacent) else {
            continue;
        };
        let Some(extent) = grow_extent(ctx, probe, &group.name) else {
            tracing::trace!(scope = %group.name, "Scope extent outside the search window");
            continue;
        };
        let Some(extent_text) = ctx.text.get(extent.range()) else {
            continue;
        };

        for &rule_index in &group.rules {
            let rule = &ctx.rules.scope_rules()[rule_index];
            let token = |span: (usize, usize), side| Token {
                begin: extent.begin() + span.0,
                end: extent.begin() + span.1,
                rule: rule_index,
                group: Some(group_index),
                side,
            };
            let mut left = rule
                .find_open(extent_text)
                .map(|span| token(span, BracketSide::Open))
                .filter(|t| ctx.validate(t));
            let mut right = rule
                .find_close(extent_text)
                .map(|span| token(span, BracketSide::Close))
                .filter(|t| ctx.validate(t));

            if let (Some(l), Some(r)) = (left, right) {
                if !ctx.compare(&l, &r) {
                    left = None;
                    right = None;
                }
            }

            let candidate = ScopeCandidate {
                left,
                right,
                group: group_index,
                rule: rule_index,
                adjusted_center,
            };
            if candidate.is_full() {
                return contained(candidate);
            }
            if partial.is_none() && (left.is_some() || right.is_some()) {
                partial = Some(candidate);
            }
        }
    }

    partial.and_then(contained)
}

/// Where to read the scope extent from, and the cursor position used for
/// the containment check.
fn locate<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    scope: &str,
    adjacent: Direction,
) -> Option<(usize, usize)> {
    let center = ctx.center;
    let at = |offset| ctx.view.match_selector(offset, scope);

    if center >= 1 && at(center) && at(center - 1) {
        return Some((center, center));
    }
    if !ctx.options.outside_adjacent {
        return None;
    }
    match adjacent {
        Direction::Left if center >= 1 && at(center - 1) => Some((center - 1, center - 1)),
        Direction::Right if at(center) => Some((center, center + 1)),
        _ => None,
    }
}

/// The full extent of the scope run at `probe`, merged across adjacent
/// fragments.
///
/// The run under the cursor is clipped to the search window, and a clipped
/// side is not grown. `None` if growing into a neighbouring fragment would
/// reach outside the window.
fn grow_extent<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    probe: usize,
    scope: &str,
) -> Option<Region> {
    let view = ctx.view;
    let len = ctx.text.len();
    let run = view.extract_scope(probe)?;
    let mut extent = Region::new(
        run.begin().max(ctx.window.start),
        run.end().min(ctx.window.end),
    );
    if extent.is_empty() {
        return None;
    }

    if extent.begin() == run.begin() {
        while extent.begin() > 0 && view.match_selector(extent.begin() - 1, scope) {
            let Some(fragment) = view.extract_scope(extent.begin() - 1) else {
                break;
            };
            let grown = extent.cover(&fragment);
            if grown == extent {
                break;
            }
            extent = grown;
            if !ctx.window.covers(extent) {
                return None;
            }
        }
    }

    if extent.end() == run.end() {
        while extent.end() < len && view.match_selector(extent.end(), scope) {
            let Some(fragment) = view.extract_scope(extent.end()) else {
                break;
            };
            let grown = extent.cover(&fragment);
            if grown == extent {
                break;
            }
            extent = grown;
            if !ctx.window.covers(extent) {
                return None;
            }
        }
    }

    Some(extent)
}

/// Drops a candidate whose extent no longer holds the cursor.
fn contained(candidate: ScopeCandidate) -> Option<ScopeCandidate> {
    let center = candidate.adjusted_center;
    let outside = candidate.left.is_some_and(|l| center <= l.begin)
        || candidate.right.is_some_and(|r| center >= r.end);
    (!outside).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchOptions;
    use crate::definition::{RuleDefinitions, ScopeDefinition};
    use crate::rules::RuleSet;
    use crate::token::SearchWindow;
    use delimit_buffer::{ScopeMap, ScopedView};
    use delimit_plugin::HookRegistry;

    fn rules() -> RuleSet {
        let defs = RuleDefinitions::new(
            vec![],
            vec![
                ScopeDefinition::new("double", ["string"], r#"(")"#, r#"(")"#),
                ScopeDefinition::new("single", ["string"], "(')", "(')"),
            ],
        );
        RuleSet::build("plain text", &defs, &HookRegistry::new())
    }

    fn find(
        text: &str,
        runs: &[(usize, usize)],
        center: usize,
        options: &MatchOptions,
        adjacent: Direction,
    ) -> Option<(Option<usize>, Option<usize>)> {
        let rules = rules();
        let mut scopes = ScopeMap::new();
        for &(begin, end) in runs {
            scopes.push(begin, end, "string.quoted").unwrap();
        }
        let view = ScopedView::new(text, scopes);
        let ctx = MatchContext {
            rules: &rules,
            view: &view,
            text,
            options,
            window: SearchWindow::around(center, text.len(), options.search_threshold),
            center,
        };
        match_scopes(&ctx, adjacent).map(|c| (c.left.map(|t| t.begin), c.right.map(|t| t.begin)))
    }

    #[test]
    fn test_inside_string() {
        let text = r#"x = "abc";"#;
        let options = MatchOptions::default();
        assert_eq!(
            find(text, &[(4, 9)], 6, &options, Direction::Left),
            Some((Some(4), Some(8)))
        );
        // Second rule of the group wins when the first has no tokens.
        let text = "x = 'abc';";
        assert_eq!(
            find(text, &[(4, 9)], 6, &options, Direction::Left),
            Some((Some(4), Some(8)))
        );
    }

    #[test]
    fn test_not_inside_at_boundary() {
        let text = r#"x = "abc";"#;
        let options = MatchOptions::default();
        assert_eq!(find(text, &[(4, 9)], 4, &options, Direction::Left), None);
        assert_eq!(find(text, &[(4, 9)], 9, &options, Direction::Left), None);
        assert_eq!(find(text, &[], 6, &options, Direction::Left), None);
    }

    #[test]
    fn test_outside_adjacent() {
        let text = r#"x = "abc";"#;
        let options = MatchOptions {
            outside_adjacent: true,
            ..MatchOptions::default()
        };
        // Cursor right after the closing quote borrows the scope on its left.
        assert_eq!(
            find(text, &[(4, 9)], 9, &options, Direction::Left),
            Some((Some(4), Some(8)))
        );
        // Cursor right before the opening quote borrows the scope on its right.
        assert_eq!(
            find(text, &[(4, 9)], 4, &options, Direction::Right),
            Some((Some(4), Some(8)))
        );
        assert_eq!(find(text, &[(4, 9)], 4, &options, Direction::Left), None);
    }

    #[test]
    fn test_fragments_are_merged() {
        let text = r#""ab\ncd""#;
        let options = MatchOptions::default();
        assert_eq!(
            find(text, &[(0, 3), (3, 5), (5, 8)], 6, &options, Direction::Left),
            Some((Some(0), Some(7)))
        );
    }

    #[test]
    fn test_partial_scope() {
        // Unterminated string: only the opening quote is found.
        let text = r#"x = "abc"#;
        let options = MatchOptions::default();
        assert_eq!(
            find(text, &[(4, 8)], 6, &options, Direction::Left),
            Some((Some(4), None))
        );
    }

    #[test]
    fn test_run_past_window_is_clipped() {
        // The closing quote lies outside the window: only the open side is seen.
        let text = format!("x = \"{}\"", "a".repeat(100));
        let options = MatchOptions {
            search_threshold: Some(20),
            ..MatchOptions::default()
        };
        assert_eq!(
            find(&text, &[(4, 106)], 8, &options, Direction::Left),
            Some((Some(4), None))
        );
        // Neither quote in the window.
        assert_eq!(find(&text, &[(4, 106)], 50, &options, Direction::Left), None);
    }

    #[test]
    fn test_growth_past_window_is_discarded() {
        let text = format!("x = \"{}\"", "a".repeat(100));
        let options = MatchOptions {
            search_threshold: Some(20),
            ..MatchOptions::default()
        };
        assert_eq!(
            find(&text, &[(4, 10), (10, 106)], 6, &options, Direction::Left),
            None
        );
    }
}
