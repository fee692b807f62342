//! Candidate tokens around a center, handed out nearest-first.

use delimit_plugin::BracketSide;

use crate::pattern::TokenPattern;
use crate::token::{SearchWindow, Token};

/// Which side of the center a walk moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
        }
    }
}

/// Scan state of one matching pass.
///
/// Tokens are split by direction and side once, up front. Each side
/// (open, close) then has its own walk state: where it stands, whether it
/// ran out, and the last token it yielded so the caller can push that
/// token back with [`remember`](Self::remember).
#[derive(Debug)]
pub(crate) struct BracketSearch {
    center: usize,
    touch_right: bool,
    /// `[direction][side]`, each in buffer order
    tokens: [[Vec<Token>; 2]; 2],
    pos: [Option<usize>; 2],
    done: [bool; 2],
    prev: [Option<Token>; 2],
    replay: [bool; 2],
}

impl BracketSearch {
    /// Scans `window` of `text` and splits the legal tokens around `center`.
    ///
    /// With `outside_adjacent`, an open token starting at the center (or
    /// failing that, a close token ending there) is pulled inside by moving
    /// the center across it.
    pub fn new<F>(
        text: &str,
        window: SearchWindow,
        center: usize,
        pattern: &TokenPattern,
        outside_adjacent: bool,
        mut is_illegal: F,
    ) -> Self
    where
        F: FnMut(&Token) -> bool,
    {
        let candidates: Vec<Token> = pattern
            .tokens(text, window.range())
            .filter(|token| {
                let illegal = is_illegal(token);
                if illegal {
                    tracing::trace!(begin = token.begin, rule = token.rule, "Illegal candidate");
                }
                !illegal
            })
            .collect();

        let mut center = center;
        let mut touch_right = false;
        if outside_adjacent {
            let opens_here = candidates
                .iter()
                .find(|t| t.side == BracketSide::Open && t.begin == center);
            let closes_here = candidates
                .iter()
                .find(|t| t.side == BracketSide::Close && t.end == center);
            touch_right = candidates.iter().any(|t| t.begin == center);
            if let Some(open) = opens_here {
                center = open.end;
            } else if let Some(close) = closes_here {
                center = close.begin;
            }
        }

        let mut tokens: [[Vec<Token>; 2]; 2] = Default::default();
        for token in candidates {
            let direction = match token.side {
                BracketSide::Open if token.begin < center => Direction::Left,
                BracketSide::Close if token.end <= center => Direction::Left,
                _ => Direction::Right,
            };
            tokens[direction.index()][token.side.index()].push(token);
        }

        Self {
            center,
            touch_right,
            tokens,
            pos: [None; 2],
            done: [false; 2],
            prev: [None; 2],
            replay: [false; 2],
        }
    }

    /// The center after any outside-adjacent adjustment.
    pub fn center(&self) -> usize {
        self.center
    }

    /// Returns true if a legal token starts right at the cursor.
    pub fn touches_right(&self) -> bool {
        self.touch_right
    }

    /// The next `side` token walking in `direction`, nearest first.
    pub fn next(&mut self, direction: Direction, side: BracketSide) -> Option<Token> {
        let k = side.index();
        if self.done[k] {
            return None;
        }
        if self.replay[k] {
            self.replay[k] = false;
            if let Some(token) = self.prev[k] {
                return Some(token);
            }
        }

        let list = &self.tokens[direction.index()][k];
        let token = match direction {
            Direction::Left => {
                let pos = self.pos[k].get_or_insert(list.len());
                if *pos == 0 {
                    None
                } else {
                    *pos -= 1;
                    Some(list[*pos])
                }
            }
            Direction::Right => {
                let pos = self.pos[k].get_or_insert(0);
                let token = list.get(*pos).copied();
                if token.is_some() {
                    *pos += 1;
                }
                token
            }
        };

        match token {
            Some(token) => {
                self.prev[k] = Some(token);
                Some(token)
            }
            None => {
                self.done[k] = true;
                None
            }
        }
    }

    /// Yield the last `side` token again on the next call.
    pub fn remember(&mut self, side: BracketSide) {
        let k = side.index();
        self.replay[k] = true;
        self.done[k] = false;
    }

    /// Returns true once the `side` walk ran out.
    pub fn is_done(&self, side: BracketSide) -> bool {
        self.done[side.index()]
    }

    /// Starts both walks over, for the other direction.
    pub fn reset(&mut self) {
        self.pos = [None; 2];
        self.done = [false; 2];
        self.prev = [None; 2];
        self.replay = [false; 2];
    }
}
