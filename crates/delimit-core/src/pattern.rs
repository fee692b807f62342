//! The combined token pattern of a rule set.
//!
//! Every eligible literal rule contributes two named alternatives, one for
//! its open form and one for its close form. A slot table maps each
//! alternative back to its rule, so rules that sit out a search mode are
//! simply left out of the alternation.

use std::ops::Range;

use delimit_plugin::BracketSide;
use regex::{Regex, RegexBuilder};

use crate::rules::BracketRule;
use crate::token::Token;

/// One alternative of the combined pattern.
#[derive(Debug, Clone, Copy)]
struct Slot {
    rule: usize,
    side: BracketSide,
    /// Group wrapping the whole alternative
    outer: usize,
    /// First capture group of the user pattern, if it has one
    inner: Option<usize>,
}

/// Compiled alternation over the open and close forms of several rules.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    regex: Regex,
    slots: Vec<Slot>,
}

impl TokenPattern {
    /// Builds the alternation over `rules`, given with their rule indices.
    ///
    /// Returns `Ok(None)` when no rule is eligible.
    pub(crate) fn compile<'a, I>(rules: I) -> Result<Option<Self>, regex::Error>
    where
        I: IntoIterator<Item = (usize, &'a BracketRule)>,
    {
        let mut alternatives = Vec::new();
        let mut members = Vec::new();
        for (index, rule) in rules {
            for side in [BracketSide::Open, BracketSide::Close] {
                let source = rule.source(side);
                alternatives.push(format!("(?P<{}>{})", group_name(index, side), source));
                members.push((index, side, rule.has_group(side)));
            }
        }
        if alternatives.is_empty() {
            return Ok(None);
        }

        let regex = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .multi_line(true)
            .build()?;

        let names: Vec<Option<&str>> = regex.capture_names().collect();
        let slots = members
            .into_iter()
            .filter_map(|(rule, side, grouped)| {
                let wanted = group_name(rule, side);
                let outer = names.iter().position(|n| *n == Some(wanted.as_str()))?;
                Some(Slot {
                    rule,
                    side,
                    outer,
                    inner: grouped.then_some(outer + 1),
                })
            })
            .collect();

        Ok(Some(Self { regex, slots }))
    }

    /// Candidate tokens in `window` of `text`, in buffer order.
    ///
    /// The window must lie on character boundaries.
    pub(crate) fn tokens<'t>(
        &'t self,
        text: &'t str,
        window: Range<usize>,
    ) -> impl Iterator<Item = Token> + 't {
        let base = window.start;
        let haystack = text.get(window).unwrap_or("");
        self.regex.captures_iter(haystack).filter_map(move |caps| {
            let slot = self.slots.iter().find(|s| caps.get(s.outer).is_some())?;
            let span = slot
                .inner
                .and_then(|i| caps.get(i))
                .or_else(|| caps.get(slot.outer))?;
            Some(Token {
                begin: base + span.start(),
                end: base + span.end(),
                rule: slot.rule,
                group: None,
                side: slot.side,
            })
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

fn group_name(rule: usize, side: BracketSide) -> String {
    match side {
        BracketSide::Open => format!("__open{rule}"),
        BracketSide::Close => format!("__close{rule}"),
    }
}
