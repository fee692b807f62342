//! Rope-backed text buffer.
//!
//! ## Why Rope?
//!
//! Bracket matching reads the same buffer once per cursor, and a host may
//! hand the matcher a snapshot of a large file on every pass. Cloning a rope
//! shares its chunks, so a snapshot costs almost nothing.
//!
//! ## Learning: Byte vs Char Indices
//!
//! `ropey` indexes by `char`, the matcher by byte. Every slice here
//! takes byte offsets and converts at the boundary, rejecting offsets that
//! split a UTF-8 sequence.

use ropey::Rope;
use std::borrow::Cow;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::{BufferError, BufferResult};

/// A text buffer backed by a rope data structure.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send` and `Sync`; the matcher only ever reads it, so a
/// shared reference can be handed to several matching passes at once.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    /// The rope holding our text content
    rope: Rope,

    /// Associated file path (if any)
    file_path: Option<PathBuf>,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use delimit_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            file_path: None,
        }
    }

    /// Loads a buffer from a file.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        Ok(Self {
            rope: Rope::from_str(&content),
            file_path: Some(path.to_path_buf()),
        })
    }

    // ==================== Text Access ====================

    /// Returns the entire text content.
    ///
    /// Borrowed when the rope is a single chunk, allocated otherwise.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        self.rope.slice(..).into()
    }

    /// Returns the text in a byte range.
    pub fn slice(&self, range: Range<usize>) -> BufferResult<Cow<'_, str>> {
        let chars = self.char_range(range)?;
        Ok(self.rope.slice(chars).into())
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// Returns the number of bytes in the buffer.
    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    // ==================== Offset Conversion ====================

    /// Converts a byte offset into a char index, rejecting split sequences.
    pub fn byte_to_char(&self, byte_idx: usize) -> BufferResult<usize> {
        if byte_idx > self.rope.len_bytes() {
            return Err(BufferError::InvalidByteIndex(byte_idx));
        }
        let char_idx = self.rope.byte_to_char(byte_idx);
        if self.rope.char_to_byte(char_idx) != byte_idx {
            return Err(BufferError::NotCharBoundary(byte_idx));
        }
        Ok(char_idx)
    }

    fn char_range(&self, range: Range<usize>) -> BufferResult<Range<usize>> {
        if range.start > range.end {
            return Err(BufferError::InvalidRegion {
                begin: range.start,
                end: range.end,
            });
        }
        Ok(self.byte_to_char(range.start)?..self.byte_to_char(range.end)?)
    }

    /// Returns the associated file path, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            file_path: None,
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_by_bytes() {
        let buffer = TextBuffer::from("é(x)");
        // 'é' is two bytes wide
        assert_eq!(buffer.slice(2..5).unwrap(), "(x)");
    }

    #[test]
    fn test_split_char_rejected() {
        let buffer = TextBuffer::from("é(x)");
        assert!(matches!(
            buffer.slice(1..3),
            Err(BufferError::NotCharBoundary(1))
        ));
    }

    #[test]
    fn test_out_of_bounds() {
        let buffer = TextBuffer::from("abc");
        assert!(matches!(
            buffer.slice(1..10),
            Err(BufferError::InvalidByteIndex(10))
        ));
        assert!(matches!(
            buffer.slice(2..1),
            Err(BufferError::InvalidRegion { begin: 2, end: 1 })
        ));
    }

    #[test]
    fn test_byte_to_char() {
        let buffer = TextBuffer::from("é(x)");
        assert_eq!(buffer.byte_to_char(0).unwrap(), 0);
        assert_eq!(buffer.byte_to_char(2).unwrap(), 1);
        assert_eq!(buffer.byte_to_char(5).unwrap(), 4);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "[1, 2]").unwrap();

        let buffer = TextBuffer::from_file(&path).unwrap();
        assert_eq!(buffer.text(), "[1, 2]");
        assert_eq!(buffer.file_path(), Some(path.as_path()));
    }
}
