//! # Delimit Buffer
//!
//! The host-side collaborators the matcher reads from: a rope-backed text
//! buffer, offset regions, and a scope classification map.
//!
//! ## Offsets
//!
//! Every offset in this crate is a **byte** offset into the UTF-8 text.
//! Regex engines report byte positions, so keeping the whole pipeline in
//! bytes avoids converting back and forth on every candidate.
//!
//! ## Learning: Traits as Host Interfaces
//!
//! The matcher never owns the buffer. It talks to it through the
//! [`BufferView`] trait, so an editor can plug in its own storage while
//! tests use a plain `&str`.

mod buffer;
mod region;
mod scope;
mod view;

pub use buffer::TextBuffer;
pub use region::Region;
pub use scope::{ScopeMap, ScopeRun, selector_matches};
pub use view::{BufferView, ScopedView};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Invalid byte index: {0}")]
    InvalidByteIndex(usize),

    #[error("Byte index {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("Region {begin}..{end} is invalid")]
    InvalidRegion { begin: usize, end: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
