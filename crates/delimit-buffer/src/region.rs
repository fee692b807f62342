//! Offset regions.
//!
//! ## Learning: Anchored Ranges
//!
//! A `Region` keeps its two ends as written (`a` is the anchor, `b` the
//! caret), so a backwards selection survives a round trip. Code that only
//! cares about the covered text uses `begin()`/`end()`, which normalize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A range of byte offsets, possibly empty (a point cursor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    /// Anchor offset
    pub a: usize,
    /// Caret offset
    pub b: usize,
}

impl Region {
    /// Creates a region from anchor and caret.
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Creates a zero-width region (a point cursor).
    pub fn point(offset: usize) -> Self {
        Self { a: offset, b: offset }
    }

    /// The lower of the two ends.
    #[inline]
    pub fn begin(&self) -> usize {
        self.a.min(self.b)
    }

    /// The upper of the two ends.
    #[inline]
    pub fn end(&self) -> usize {
        self.a.max(self.b)
    }

    /// Number of bytes covered.
    pub fn size(&self) -> usize {
        self.end() - self.begin()
    }

    /// Returns true for a point cursor.
    pub fn is_empty(&self) -> bool {
        self.a == self.b
    }

    /// Returns true if `offset` is within `[begin, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.begin() && offset < self.end()
    }

    /// Returns true if this region overlaps with another.
    pub fn intersects(&self, other: &Region) -> bool {
        self.begin() < other.end() && other.begin() < self.end()
    }

    /// Smallest region covering both.
    pub fn cover(&self, other: &Region) -> Region {
        Region::new(self.begin().min(other.begin()), self.end().max(other.end()))
    }

    /// Normalized `begin..end` range, for slicing.
    pub fn range(&self) -> Range<usize> {
        self.begin()..self.end()
    }
}

impl From<usize> for Region {
    fn from(offset: usize) -> Self {
        Region::point(offset)
    }
}

impl From<Range<usize>> for Region {
    fn from(range: Range<usize>) -> Self {
        Region::new(range.start, range.end)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.begin(), self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_ends() {
        let region = Region::new(9, 4);
        assert_eq!(region.begin(), 4);
        assert_eq!(region.end(), 9);
        assert_eq!(region.size(), 5);
        assert_eq!(region.to_string(), "4..9");
    }

    #[test]
    fn test_contains() {
        let region = Region::from(5..10);
        assert!(!region.contains(4));
        assert!(region.contains(5));
        assert!(region.contains(9));
        assert!(!region.contains(10));
    }

    #[test]
    fn test_cover_and_intersect() {
        let a = Region::from(2..6);
        let b = Region::from(5..8);
        let c = Region::from(8..9);
        assert!(a.intersects(&b));
        assert!(!b.intersects(&c));
        assert_eq!(a.cover(&c), Region::from(2..9));
    }

    #[test]
    fn test_point() {
        let cursor = Region::from(3);
        assert!(cursor.is_empty());
        assert_eq!(cursor.range(), 3..3);
    }
}
