//! The read interface the matcher consumes.

use std::borrow::Cow;
use std::ops::Range;

use crate::{Region, ScopeMap, TextBuffer};

/// Read-only access to a buffer and its scope classification.
///
/// Scope methods default to "no classification", which is what a plain
/// text view reports: no offset satisfies any selector and there are no
/// scope extents.
pub trait BufferView {
    /// Buffer length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text in a byte range. Out-of-range ends are clamped.
    fn read_text(&self, range: Range<usize>) -> Cow<'_, str>;

    /// Whether the classification at `offset` satisfies `selector`.
    fn match_selector(&self, _offset: usize, _selector: &str) -> bool {
        false
    }

    /// The contiguous classified run containing `offset`.
    fn extract_scope(&self, _offset: usize) -> Option<Region> {
        None
    }
}

impl BufferView for str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn read_text(&self, range: Range<usize>) -> Cow<'_, str> {
        let end = floor_boundary(self, range.end.min(str::len(self)));
        let start = floor_boundary(self, range.start.min(end));
        Cow::Borrowed(&self[start..end])
    }
}

impl BufferView for String {
    fn len(&self) -> usize {
        self.as_str().len()
    }

    fn read_text(&self, range: Range<usize>) -> Cow<'_, str> {
        self.as_str().read_text(range)
    }
}

impl BufferView for TextBuffer {
    fn len(&self) -> usize {
        self.len_bytes()
    }

    fn read_text(&self, range: Range<usize>) -> Cow<'_, str> {
        let end = range.end.min(self.len_bytes());
        let start = range.start.min(end);
        self.slice(start..end).unwrap_or_else(|_| {
            // Offsets split a character: fall back to the whole-text path,
            // which snaps to boundaries.
            let text = self.text();
            let end = floor_boundary(&text, end);
            let start = floor_boundary(&text, start.min(end));
            Cow::Owned(text[start..end].to_string())
        })
    }
}

impl<T: BufferView + ?Sized> BufferView for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read_text(&self, range: Range<usize>) -> Cow<'_, str> {
        (**self).read_text(range)
    }

    fn match_selector(&self, offset: usize, selector: &str) -> bool {
        (**self).match_selector(offset, selector)
    }

    fn extract_scope(&self, offset: usize) -> Option<Region> {
        (**self).extract_scope(offset)
    }
}

/// A buffer paired with its scope classification.
#[derive(Debug, Clone, Default)]
pub struct ScopedView<B> {
    pub buffer: B,
    pub scopes: ScopeMap,
}

impl<B: BufferView> ScopedView<B> {
    pub fn new(buffer: B, scopes: ScopeMap) -> Self {
        Self { buffer, scopes }
    }
}

impl<B: BufferView> BufferView for ScopedView<B> {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn read_text(&self, range: Range<usize>) -> Cow<'_, str> {
        self.buffer.read_text(range)
    }

    fn match_selector(&self, offset: usize, selector: &str) -> bool {
        offset < self.buffer.len() && self.scopes.matches(offset, selector)
    }

    fn extract_scope(&self, offset: usize) -> Option<Region> {
        self.scopes.extract(offset)
    }
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
