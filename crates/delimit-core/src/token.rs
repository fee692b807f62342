//! Located delimiter candidates and the window they are searched in.

use std::ops::Range;

use delimit_buffer::Region;
use delimit_plugin::BracketSide;
use serde::Serialize;

/// A located open or close delimiter.
///
/// `rule` indexes the literal rules of a [`RuleSet`](crate::RuleSet), or
/// its scope rules when `group` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub begin: usize,
    pub end: usize,
    pub rule: usize,
    /// Scope group, for tokens produced by the scope matcher
    pub group: Option<usize>,
    pub side: BracketSide,
}

impl Token {
    pub fn region(&self) -> Region {
        Region::new(self.begin, self.end)
    }

    pub fn is_scope(&self) -> bool {
        self.group.is_some()
    }

    /// The same token relocated to `region`.
    pub fn moved(self, region: Region) -> Self {
        Self {
            begin: region.begin(),
            end: region.end(),
            ..self
        }
    }

    /// The same token relocated to `region` and assigned to `side`.
    pub(crate) fn moved_to(self, region: Region, side: BracketSide) -> Self {
        Self {
            side,
            ..self.moved(region)
        }
    }
}

/// The `[start, end)` byte range one matching pass may look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchWindow {
    pub start: usize,
    pub end: usize,
}

impl SearchWindow {
    /// The whole buffer.
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    /// A window of roughly `threshold` bytes centered on `center`.
    ///
    /// When the center sits near a buffer edge, the side that runs out of
    /// room lends its unused share to the other side. `None` searches the
    /// whole buffer. A threshold of zero collapses the window.
    pub fn around(center: usize, len: usize, threshold: Option<usize>) -> Self {
        let Some(threshold) = threshold else {
            return Self::full(len);
        };
        let center = center.min(len);
        let limit = threshold / 2;
        let left_room = center;
        let right_room = len - center;

        let right_pad = limit.saturating_sub(left_room);
        let left_pad = limit.saturating_sub(right_room);
        let left_limit = limit + left_pad;
        let right_limit = limit + right_pad;

        let start = if left_room >= left_limit {
            center - left_limit
        } else {
            0
        };
        let end = if right_room >= right_limit {
            center + right_limit
        } else {
            len
        };
        Self { start, end }
    }

    /// Shrinks both ends onto character boundaries of `text`.
    pub(crate) fn snapped(self, text: &str) -> Self {
        let mut end = self.end.min(text.len());
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut start = self.start.min(end);
        while start < end && !text.is_char_boundary(start) {
            start += 1;
        }
        Self { start, end }
    }

    pub fn width(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns true if `region` lies entirely inside the window.
    pub fn covers(&self, region: Region) -> bool {
        self.start <= region.begin() && region.end() <= self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Region> for SearchWindow {
    fn from(region: Region) -> Self {
        Self {
            start: region.begin(),
            end: region.end(),
        }
    }
}
