//! The transform pipeline run on a cursor's winning pair.
//!
//! A transform sees the final pair and the output selection of one cursor.
//! It can move either side, clear one or both, replace the selection, or
//! raise `no_bracket` to keep the cursor's plain selection and drop the
//! match.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use delimit_buffer::Region;
use serde::{Deserialize, Serialize};

use crate::HookError;

/// Rule name that makes a target list apply to every rule.
pub const ALL_RULES: &str = "__all__";

/// What a transform is handed.
#[derive(Debug, Clone)]
pub struct TransformInput<'a> {
    /// Rule name of the pair
    pub name: &'a str,
    pub left: Region,
    pub right: Region,
    /// Output selection so far
    pub regions: Vec<Region>,
    /// Whole buffer text
    pub text: &'a str,
}

/// What a transform hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub left: Option<Region>,
    pub right: Option<Region>,
    pub regions: Vec<Region>,
    /// Keep the plain selection and report no match
    pub no_bracket: bool,
}

impl TransformOutput {
    /// The input passed through untouched.
    pub fn unchanged(input: &TransformInput<'_>) -> Self {
        Self {
            left: Some(input.left),
            right: Some(input.right),
            regions: input.regions.clone(),
            no_bracket: false,
        }
    }
}

pub trait Transform: Send + Sync {
    fn run(&self, input: TransformInput<'_>) -> Result<TransformOutput, HookError>;
}

impl<F> Transform for F
where
    F: Fn(TransformInput<'_>) -> Result<TransformOutput, HookError> + Send + Sync,
{
    fn run(&self, input: TransformInput<'_>) -> Result<TransformOutput, HookError> {
        self(input)
    }
}

/// Which rules a pipeline stage applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum TransformTargets {
    All,
    Rules(BTreeSet<String>),
}

impl TransformTargets {
    /// Builds targets from rule names; `__all__` selects every rule.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.contains(ALL_RULES) {
            Self::All
        } else {
            Self::Rules(names)
        }
    }

    pub fn applies_to(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Rules(names) => names.contains(name),
        }
    }
}

impl From<Vec<String>> for TransformTargets {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<TransformTargets> for Vec<String> {
    fn from(targets: TransformTargets) -> Self {
        match targets {
            TransformTargets::All => vec![ALL_RULES.to_string()],
            TransformTargets::Rules(names) => names.into_iter().collect(),
        }
    }
}

#[derive(Clone)]
struct Stage {
    label: String,
    targets: TransformTargets,
    transform: Arc<dyn Transform>,
}

/// Ordered transforms applied to a winning pair.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    stages: Vec<Stage>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        targets: TransformTargets,
        transform: Arc<dyn Transform>,
    ) -> &mut Self {
        self.stages.push(Stage {
            label: label.into(),
            targets,
            transform,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage targeting `name`, in order.
    ///
    /// Stops early once a stage clears a side or raises `no_bracket`. A
    /// failing stage is logged and skipped.
    pub fn run(
        &self,
        name: &str,
        left: Region,
        right: Region,
        regions: Vec<Region>,
        text: &str,
    ) -> TransformOutput {
        let mut current = TransformOutput {
            left: Some(left),
            right: Some(right),
            regions,
            no_bracket: false,
        };

        for stage in self.stages.iter().filter(|s| s.targets.applies_to(name)) {
            let (Some(left), Some(right)) = (current.left, current.right) else {
                break;
            };
            if current.no_bracket {
                break;
            }

            let input = TransformInput {
                name,
                left,
                right,
                regions: current.regions.clone(),
                text,
            };
            match stage.transform.run(input) {
                Ok(output) => current = output,
                Err(e) => {
                    tracing::warn!(transform = %stage.label, rule = name, "Transform failed: {}", e);
                }
            }
        }

        current
    }
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| (&s.label, &s.targets)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_right(input: TransformInput<'_>) -> Result<TransformOutput, HookError> {
        Ok(TransformOutput {
            right: None,
            ..TransformOutput::unchanged(&input)
        })
    }

    #[test]
    fn test_targets() {
        let some = TransformTargets::from_names(["round", "square"]);
        assert!(some.applies_to("round"));
        assert!(!some.applies_to("curly"));

        let all = TransformTargets::from_names(["round", ALL_RULES]);
        assert_eq!(all, TransformTargets::All);
        assert!(all.applies_to("anything"));
    }

    #[test]
    fn test_targets_serde() {
        #[derive(Deserialize)]
        struct Section {
            targets: TransformTargets,
        }

        let section: Section = toml::from_str(r#"targets = ["__all__"]"#).unwrap();
        assert_eq!(section.targets, TransformTargets::All);

        let section: Section = toml::from_str(r#"targets = ["tag"]"#).unwrap();
        assert!(section.targets.applies_to("tag"));
        assert!(!section.targets.applies_to("round"));
    }

    #[test]
    fn test_empty_pipeline_passes_through() {
        let pipeline = TransformPipeline::new();
        let out = pipeline.run(
            "round",
            Region::new(0, 1),
            Region::new(4, 5),
            vec![Region::point(2)],
            "(abc)",
        );
        assert_eq!(out.left, Some(Region::new(0, 1)));
        assert_eq!(out.regions, vec![Region::point(2)]);
        assert!(!out.no_bracket);
    }

    #[test]
    fn test_stage_targets_and_short_circuit() {
        let mut pipeline = TransformPipeline::new();
        pipeline
            .push("clear", TransformTargets::from_names(["round"]), Arc::new(clear_right))
            .push(
                "never",
                TransformTargets::All,
                Arc::new(|_: TransformInput<'_>| -> Result<TransformOutput, HookError> {
                    panic!("stage after a cleared side must not run")
                }),
            );

        let out = pipeline.run("round", Region::new(0, 1), Region::new(4, 5), vec![], "(abc)");
        assert_eq!(out.right, None);

        // Different rule: the first stage is skipped, the second runs.
        let mut pipeline = TransformPipeline::new();
        pipeline.push("clear", TransformTargets::from_names(["round"]), Arc::new(clear_right));
        let out = pipeline.run("square", Region::new(0, 1), Region::new(4, 5), vec![], "[abc]");
        assert_eq!(out.right, Some(Region::new(4, 5)));
    }

    #[test]
    fn test_failing_stage_is_skipped() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(
            "broken",
            TransformTargets::All,
            Arc::new(|_: TransformInput<'_>| -> Result<TransformOutput, HookError> {
                Err(HookError::failed("boom"))
            }),
        );
        let out = pipeline.run("round", Region::new(0, 1), Region::new(4, 5), vec![], "(abc)");
        assert_eq!(out.left, Some(Region::new(0, 1)));
        assert_eq!(out.right, Some(Region::new(4, 5)));
    }
}
