//! Hooks that ship with the crate.

use delimit_buffer::Region;

use crate::{Comparator, HookError, Transform, TransformInput, TransformOutput};

/// Pairs markup tags by name.
///
/// The open token is expected at `<name`, the close token at `</name`;
/// only the token start matters, the name is read from the text after it.
/// Names compare case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagComparator;

impl Comparator for TagComparator {
    fn compare(&self, _: &str, open: Region, close: Region, text: &str) -> Result<bool, HookError> {
        let open_name = tag_name(text, open.begin(), false);
        let close_name = tag_name(text, close.begin(), true);
        Ok(match (open_name, close_name) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        })
    }
}

fn tag_name(text: &str, at: usize, closing: bool) -> Option<&str> {
    let rest = text.get(at..)?.strip_prefix('<')?;
    let rest = if closing { rest.strip_prefix('/')? } else { rest };
    let len = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.')))
        .unwrap_or(rest.len());
    (len > 0).then(|| &rest[..len])
}

/// Replaces the output selection with the pair's content.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectContent {
    /// Select the delimiters too, not just what lies between them
    pub include_delimiters: bool,
}

impl Transform for SelectContent {
    fn run(&self, input: TransformInput<'_>) -> Result<TransformOutput, HookError> {
        let selection = if self.include_delimiters {
            Region::new(input.left.begin(), input.right.end())
        } else {
            Region::new(input.left.end(), input.right.begin())
        };
        Ok(TransformOutput {
            regions: vec![selection],
            ..TransformOutput::unchanged(&input)
        })
    }
}
