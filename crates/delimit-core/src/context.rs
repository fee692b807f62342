//! What one matching pass shares between the matchers.
//!
//! Hook calls go through here so the failure policy lives in one place: a
//! hook error is logged and the default answer is used.

use delimit_buffer::BufferView;
use delimit_plugin::{BracketSide, PostMatchInput};

use crate::config::MatchOptions;
use crate::rules::RuleSet;
use crate::token::{SearchWindow, Token};

/// A resolved pair before outcome classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Pair {
    pub left: Option<Token>,
    pub right: Option<Token>,
    pub style: Option<String>,
}

impl Pair {
    pub fn new(left: Option<Token>, right: Option<Token>) -> Self {
        Self {
            left,
            right,
            style: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

pub(crate) struct MatchContext<'a, B: ?Sized> {
    pub rules: &'a RuleSet,
    pub view: &'a B,
    pub text: &'a str,
    pub options: &'a MatchOptions,
    pub window: SearchWindow,
    /// Cursor offset the pass started from
    pub center: usize,
}

impl<B: ?Sized> Clone for MatchContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for MatchContext<'_, B> {}

impl<'a, B: BufferView + ?Sized> MatchContext<'a, B> {
    /// The same pass restricted to another window.
    pub fn within(self, window: SearchWindow) -> Self {
        Self { window, ..self }
    }

    /// Runs the token's validate hook. Errors count as valid.
    pub fn validate(&self, token: &Token) -> bool {
        if !self.rules.hook_presence().validate {
            return true;
        }
        let rule = self.rules.rule_ref(token);
        match rule
            .hooks
            .validate
            .validate(rule.name, token.region(), token.side, self.text)
        {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(rule = rule.name, "Validate hook failed: {}", e);
                true
            }
        }
    }

    /// Returns true if `open` and `close` belong together.
    ///
    /// Literal tokens must come from the same rule; the rule's compare hook
    /// can then still reject the pair. Errors keep the rule-level answer.
    pub fn compare(&self, open: &Token, close: &Token) -> bool {
        let same_rule = open.is_scope() || open.rule == close.rule;
        if !same_rule || !self.rules.hook_presence().compare {
            return same_rule;
        }
        let rule = self.rules.rule_ref(open);
        match rule
            .hooks
            .compare
            .compare(rule.name, open.region(), close.region(), self.text)
        {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(rule = rule.name, "Compare hook failed: {}", e);
                same_rule
            }
        }
    }

    /// Drops a pair the cursor does not touch, when only adjacent pairs
    /// are wanted.
    pub fn adjacent_check(&self, pair: Pair) -> Pair {
        if !self.options.adjacent_only {
            return pair;
        }
        let center = self.center;
        let detached = match (pair.left, pair.right) {
            (Some(l), Some(r)) => l.end < center && center < r.begin,
            (Some(l), None) => l.end < center,
            (None, Some(r)) => center < r.begin,
            (None, None) => false,
        };
        if detached { Pair::default() } else { pair }
    }

    /// Sets the pair's style and runs the rule's post-match hook.
    pub fn post_match(&self, pair: Pair) -> Pair {
        let Some(anchor) = pair.left.or(pair.right) else {
            return pair;
        };
        let rule = self.rules.rule_ref(&anchor);
        let styled = Pair {
            style: Some(rule.style.to_string()),
            ..pair
        };
        if !self.rules.hook_presence().post_match {
            return styled;
        }

        let input = PostMatchInput {
            name: rule.name,
            style: rule.style,
            left: styled.left.map(|t| t.region()),
            right: styled.right.map(|t| t.region()),
            center: self.center,
            text: self.text,
            window: self.window.range(),
        };
        match rule.hooks.post_match.post_match(&input) {
            Ok(output) => Pair {
                left: output
                    .left
                    .map(|r| anchor.moved_to(r, BracketSide::Open)),
                right: output
                    .right
                    .map(|r| anchor.moved_to(r, BracketSide::Close)),
                style: Some(output.style),
            },
            Err(e) => {
                tracing::warn!(rule = rule.name, "Post-match hook failed: {}", e);
                styled
            }
        }
    }

    /// Returns true if a backslash run before `offset` escapes it.
    pub fn is_escaped(&self, offset: usize) -> bool {
        let before = &self.text.as_bytes()[..offset.min(self.text.len())];
        let backslashes = before.iter().rev().take_while(|&&b| b == b'\\').count();
        self.options.escape_mode.is_escaped(backslashes)
    }

    /// Returns true if a literal token may not take part in the search.
    ///
    /// `scope` names the scope a sub-search runs in; it is `None` in the
    /// full search.
    pub fn is_illegal(&self, token: &Token, scope: Option<&str>) -> bool {
        let rule = &self.rules.brackets()[token.rule];
        if scope.is_some() && !rule.sub_search.in_sub_search() {
            return true;
        }
        if rule.ignore_string_escape
            && scope.is_none_or(|s| s.starts_with("string"))
            && self.is_escaped(token.begin)
        {
            return true;
        }
        if scope.is_some() {
            return false;
        }
        if rule
            .scope_exclude_exceptions
            .iter()
            .any(|sel| self.view.match_selector(token.begin, sel))
        {
            return false;
        }
        rule.scope_exclude
            .iter()
            .any(|sel| self.view.match_selector(token.begin, sel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscapeMode;
    use crate::definition::{BracketDefinition, RuleDefinitions};
    use delimit_buffer::{Region, ScopeMap, ScopedView};
    use delimit_plugin::{HookError, HookRegistry, PostMatchOutput};

    fn token(begin: usize, rule: usize, side: BracketSide) -> Token {
        Token {
            begin,
            end: begin + 1,
            rule,
            group: None,
            side,
        }
    }

    fn rules(registry: &HookRegistry) -> RuleSet {
        let defs = RuleDefinitions::new(
            vec![
                BracketDefinition::new("round", r"(\()", r"(\))")
                    .with_style("round")
                    .escape_sensitive()
                    .excluding("string, comment")
                    .except_in("string.regexp"),
                BracketDefinition::new("square", r"(\[)", r"(\])")
                    .with_compare("never")
                    .with_post_match("restyle"),
            ],
            vec![],
        );
        RuleSet::build("plain text", &defs, registry)
    }

    fn registry() -> HookRegistry {
        let mut registry = HookRegistry::new();
        registry
            .register_comparator(
                "never",
                |_: &str, _: Region, _: Region, _: &str| -> Result<bool, HookError> {
                    Err(HookError::failed("boom"))
                },
            )
            .register_post_matcher(
                "restyle",
                |input: &PostMatchInput<'_>| -> Result<PostMatchOutput, HookError> {
                    Ok(PostMatchOutput {
                        style: "hot".into(),
                        ..PostMatchOutput::unchanged(input)
                    })
                },
            );
        registry
    }

    fn context<'a>(
        rules: &'a RuleSet,
        view: &'a str,
        options: &'a MatchOptions,
        center: usize,
    ) -> MatchContext<'a, str> {
        MatchContext {
            rules,
            view,
            text: view,
            options,
            window: SearchWindow::full(view.len()),
            center,
        }
    }

    #[test]
    fn test_compare_same_rule_and_hook_error() {
        let registry = registry();
        let rules = rules(&registry);
        let options = MatchOptions::default();
        let ctx = context(&rules, "([])", &options, 2);

        assert!(ctx.compare(&token(0, 0, BracketSide::Open), &token(3, 0, BracketSide::Close)));
        assert!(!ctx.compare(&token(0, 0, BracketSide::Open), &token(2, 1, BracketSide::Close)));
        // The failing hook falls back to the rule-level answer.
        assert!(ctx.compare(&token(1, 1, BracketSide::Open), &token(2, 1, BracketSide::Close)));
    }

    #[test]
    fn test_post_match_styles() {
        let registry = registry();
        let rules = rules(&registry);
        let options = MatchOptions::default();
        let ctx = context(&rules, "([])", &options, 2);

        let pair = ctx.post_match(Pair::new(Some(token(0, 0, BracketSide::Open)), None));
        assert_eq!(pair.style.as_deref(), Some("round"));

        let pair = ctx.post_match(Pair::new(
            Some(token(1, 1, BracketSide::Open)),
            Some(token(2, 1, BracketSide::Close)),
        ));
        assert_eq!(pair.style.as_deref(), Some("hot"));
        assert_eq!(pair.right.map(|t| t.begin), Some(2));

        assert_eq!(ctx.post_match(Pair::default()), Pair::default());
    }

    #[test]
    fn test_adjacent_check() {
        let registry = registry();
        let rules = rules(&registry);
        let options = MatchOptions {
            adjacent_only: true,
            ..MatchOptions::default()
        };
        let text = "(abc)";
        let pair = || {
            Pair::new(
                Some(token(0, 0, BracketSide::Open)),
                Some(token(4, 0, BracketSide::Close)),
            )
        };

        assert!(context(&rules, text, &options, 1).adjacent_check(pair()).is_full());
        assert!(context(&rules, text, &options, 4).adjacent_check(pair()).is_full());
        assert!(context(&rules, text, &options, 2).adjacent_check(pair()).is_empty());

        let relaxed = MatchOptions::default();
        assert!(context(&rules, text, &relaxed, 2).adjacent_check(pair()).is_full());
    }

    #[test]
    fn test_escape_modes() {
        let registry = registry();
        let rules = rules(&registry);
        let mut options = MatchOptions::default();

        let ctx = context(&rules, r"\(", &options, 0);
        assert!(ctx.is_escaped(1));
        let ctx = context(&rules, r"\\(", &options, 0);
        assert!(!ctx.is_escaped(2));

        options.escape_mode = EscapeMode::Regex;
        let ctx = context(&rules, r"\(", &options, 0);
        assert!(!ctx.is_escaped(1));
        let ctx = context(&rules, r"\\(", &options, 0);
        assert!(ctx.is_escaped(2));
    }

    #[test]
    fn test_illegal_positions() {
        let registry = registry();
        let rules = rules(&registry);
        let options = MatchOptions::default();
        // "(" plain, "(" in a string, "(" in a regex string, "\(" escaped
        let text = r#"( "(" /(/ \("#;
        let mut scopes = ScopeMap::new();
        scopes.push(2, 5, "string.quoted").unwrap();
        scopes.push(6, 9, "string.regexp").unwrap();
        let view = ScopedView::new(text, scopes);
        let ctx = MatchContext {
            rules: &rules,
            view: &view,
            text,
            options: &options,
            window: SearchWindow::full(text.len()),
            center: 0,
        };

        let open = |at| token(at, 0, BracketSide::Open);
        assert!(!ctx.is_illegal(&open(0), None));
        assert!(ctx.is_illegal(&open(3), None));
        assert!(!ctx.is_illegal(&open(7), None));
        assert!(ctx.is_illegal(&open(11), None));

        // Inside a sub-search exclusions do not apply, escapes do.
        assert!(!ctx.is_illegal(&open(3), Some("string")));
        assert!(ctx.is_illegal(&open(11), Some("string")));
        assert!(!ctx.is_illegal(&open(11), Some("comment")));
        // Rules outside the sub-search set are illegal there.
        assert!(ctx.is_illegal(&token(3, 1, BracketSide::Open), Some("string")));
    }
}
