//! Literal bracket matching around a cursor.
//!
//! Both sides are resolved independently. Walking left, every close token
//! met between an open candidate and the cursor belongs to a nested pair
//! and goes on a stack; an open candidate that finds the stack empty is
//! the left bracket. The right walk mirrors this, and only accepts a close
//! token that corresponds to the left bracket found, if any.

use delimit_buffer::BufferView;
use delimit_plugin::BracketSide::{Close, Open};

use crate::context::{MatchContext, Pair};
use crate::scan::{BracketSearch, Direction::Left, Direction::Right};
use crate::token::Token;

/// Finds the innermost pair enclosing the search center.
pub(crate) fn match_brackets<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    search: &mut BracketSearch,
) -> Pair {
    let left = find_left(ctx, search);
    search.reset();
    let right = find_right(ctx, search, left);
    tracing::trace!(?left, ?right, "Bracket walk finished");
    Pair::new(left, right)
}

fn find_left<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    search: &mut BracketSearch,
) -> Option<Token> {
    let mut stack: Vec<Token> = Vec::new();

    while let Some(open) = search.next(Left, Open) {
        if !ctx.validate(&open) {
            continue;
        }
        if search.is_done(Close) {
            if let Some(top) = stack.last() {
                if ctx.compare(&open, top) {
                    stack.pop();
                    continue;
                }
            }
        }

        while let Some(close) = search.next(Left, Close) {
            if !ctx.validate(&close) {
                continue;
            }
            if open.end <= close.begin {
                stack.push(close);
            } else if !stack.is_empty() {
                // Belongs to an open further out.
                search.remember(Close);
                break;
            }
        }

        match stack.pop() {
            Some(inner) if ctx.compare(&open, &inner) => continue,
            Some(_) => return None,
            None => return Some(open),
        }
    }
    None
}

fn find_right<B: BufferView + ?Sized>(
    ctx: &MatchContext<'_, B>,
    search: &mut BracketSearch,
    left: Option<Token>,
) -> Option<Token> {
    let mut stack: Vec<Token> = Vec::new();

    while let Some(close) = search.next(Right, Close) {
        if !ctx.validate(&close) {
            continue;
        }
        if search.is_done(Open) {
            if let Some(top) = stack.last() {
                if ctx.compare(top, &close) {
                    stack.pop();
                    continue;
                }
            }
        }

        while let Some(open) = search.next(Right, Open) {
            if !ctx.validate(&open) {
                continue;
            }
            if open.end <= close.begin {
                stack.push(open);
            } else {
                search.remember(Open);
                break;
            }
        }

        match stack.pop() {
            Some(inner) if ctx.compare(&inner, &close) => continue,
            Some(_) => return None,
            None if left.is_some_and(|l| !ctx.compare(&l, &close)) => return None,
            None => return Some(close),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchOptions;
    use crate::definition::{BracketDefinition, RuleDefinitions};
    use crate::rules::RuleSet;
    use crate::token::SearchWindow;
    use delimit_buffer::Region;
    use delimit_plugin::{BracketSide, HookError, HookRegistry, Validator};

    fn rules() -> RuleSet {
        let defs = RuleDefinitions::new(
            vec![
                BracketDefinition::new("round", r"(\()", r"(\))"),
                BracketDefinition::new("square", r"(\[)", r"(\])"),
                BracketDefinition::new("curly", r"(\{)", r"(\})"),
            ],
            vec![],
        );
        RuleSet::build("plain text", &defs, &HookRegistry::new())
    }

    fn checked_rules(hook: impl Validator + 'static) -> RuleSet {
        let mut registry = HookRegistry::new();
        registry.register_validator("check", hook);
        let defs = RuleDefinitions::new(
            vec![BracketDefinition::new("round", r"(\()", r"(\))").with_validate("check")],
            vec![],
        );
        RuleSet::build("plain text", &defs, &registry)
    }

    fn pair_at(text: &str, center: usize) -> (Option<usize>, Option<usize>) {
        walk(&rules(), text, center)
    }

    fn walk(rules: &RuleSet, text: &str, center: usize) -> (Option<usize>, Option<usize>) {
        let options = MatchOptions::default();
        let ctx = MatchContext {
            rules,
            view: text,
            text,
            options: &options,
            window: SearchWindow::full(text.len()),
            center,
        };
        let mut search = BracketSearch::new(
            text,
            ctx.window,
            center,
            rules.full_pattern().unwrap(),
            false,
            |_| false,
        );
        let pair = match_brackets(&ctx, &mut search);
        (pair.left.map(|t| t.begin), pair.right.map(|t| t.begin))
    }

    #[test]
    fn test_simple_pair() {
        assert_eq!(pair_at("(abc)", 2), (Some(0), Some(4)));
    }

    #[test]
    fn test_innermost_pair() {
        assert_eq!(pair_at("foo([bar]baz)", 6), (Some(4), Some(8)));
        assert_eq!(pair_at("( [ x ] )", 4), (Some(2), Some(6)));
    }

    #[test]
    fn test_skips_nested_pairs() {
        // cursor after "(a)" and before "[b]"
        let text = "{(a) x [b]}";
        assert_eq!(pair_at(text, 5), (Some(0), Some(10)));
    }

    #[test]
    fn test_same_rule_nesting() {
        let text = "(a (b) (c) d)";
        assert_eq!(pair_at(text, 11), (Some(0), Some(12)));
        assert_eq!(pair_at(text, 4), (Some(3), Some(5)));
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(pair_at("(foo", 4), (Some(0), None));
        assert_eq!(pair_at("foo)", 0), (None, Some(3)));
        assert_eq!(pair_at("foo", 1), (None, None));
    }

    #[test]
    fn test_mismatched_rules() {
        // The close does not correspond to the open found on the left.
        assert_eq!(pair_at("(a]", 2), (Some(0), None));
        // A stray inner close of another rule stops the left walk.
        assert_eq!(pair_at("(a] b", 4), (None, None));
    }

    #[test]
    fn test_rejected_candidate_is_skipped() {
        let rules = checked_rules(
            |_: &str, region: Region, _: BracketSide, _: &str| -> Result<bool, HookError> {
                Ok(region.begin() != 3)
            },
        );
        assert!(rules.diagnostics().is_empty());
        // The open at 3 is vetoed, so the walk settles on the one further out.
        assert_eq!(walk(&rules, "(a (b c)", 5), (Some(0), Some(7)));
    }

    #[test]
    fn test_failing_validator_accepts() {
        let rules = checked_rules(
            |_: &str, _: Region, _: BracketSide, _: &str| -> Result<bool, HookError> {
                Err(HookError::failed("boom"))
            },
        );
        assert_eq!(walk(&rules, "(a (b c)", 5), (Some(3), Some(7)));
    }
}
