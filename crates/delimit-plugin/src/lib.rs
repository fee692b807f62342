//! # Delimit Plugin System
//!
//! Extension points a rule can attach to change how delimiters are matched.
//!
//! ## Hook Types
//!
//! 1. **Validators** veto a single candidate token
//! 2. **Comparators** decide whether an open and a close token belong together
//! 3. **Post-matchers** rewrite a resolved pair and its style
//! 4. **Transforms** run on the winning pair of a cursor and may replace
//!    the output selection or veto the match entirely
//!
//! ## Learning: Trait Objects for Plugins
//!
//! Rules hold their hooks as `Arc<dyn Trait>`. Every rule gets one, a no-op
//! default when the definition names none, so the matcher never branches on
//! "is there a hook here". Closures implement the traits directly, which
//! keeps ad-hoc hooks short.
//!
//! ## Failure Policy
//!
//! Hooks return `Result`. The matcher treats an `Err` as "no effect": it is
//! logged and the pre-hook answer is used.

mod builtin;
mod hooks;
mod registry;
mod transform;

pub use builtin::{SelectContent, TagComparator};
pub use hooks::{
    BracketSide, Comparator, NoComparison, NoPostMatch, NoValidation, PostMatchInput,
    PostMatchOutput, PostMatcher, Validator,
};
pub use registry::{HookKind, HookRegistry};
pub use transform::{
    ALL_RULES, Transform, TransformInput, TransformOutput, TransformPipeline, TransformTargets,
};

/// Hook system errors.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Hook failed: {0}")]
    Failed(String),

    #[error("Unknown {kind} hook: {name}")]
    NotFound { kind: HookKind, name: String },
}

impl HookError {
    /// Shorthand for a hook reporting its own failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
