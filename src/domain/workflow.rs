//! The scanned workflow tree
//!
//! A Root maps workflow file paths to Workflows, each carrying the Steps
//! found by the scanner. Steps start with only the action name and the
//! literal ref from the file; the engine fills in the resolved release
//! and upgrade candidates during a resolution pass.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::domain::{Release, UpgradeCandidates};

/// A single third-party action reference as found in a `uses:` directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// Repository identifier of the action (e.g. `actions/checkout`)
    pub name: String,
    /// The literal version expression as written in the file (semver
    /// tag, branch name, or commit hash)
    pub version_ref: String,
    /// The current release resolved from the ref, if any
    pub release: Release,
    /// The resolved upgrade candidates, if fetched
    pub upgrade_candidates: UpgradeCandidates,
}

impl Action {
    /// Create an unresolved Action from a scanned name and ref
    pub fn new(name: impl Into<String>, version_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_ref: version_ref.into(),
            release: Release::default(),
            upgrade_candidates: UpgradeCandidates::default(),
        }
    }
}

/// One occurrence of an Action within a workflow file, tagged with its
/// source line number for the rewrite phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Zero-based line number of the `uses:` declaration
    pub line_number: usize,
    pub action: Action,
}

/// A workflow file and the steps found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workflow {
    pub file_path: PathBuf,
    pub steps: Vec<Step>,
}

/// The full working set for one invocation: every scanned workflow,
/// keyed by file path. BTreeMap keeps iteration order deterministic for
/// reporting and rewriting.
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub workflows: BTreeMap<PathBuf, Workflow>,
}

impl Root {
    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    pub fn step_count(&self) -> usize {
        self.workflows.values().map(|w| w.steps.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_workflow(path: &str, steps: usize) -> Workflow {
        Workflow {
            file_path: PathBuf::from(path),
            steps: (0..steps)
                .map(|i| Step {
                    line_number: i,
                    action: Action::new("actions/checkout", "v4"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_action_new_starts_unresolved() {
        let action = Action::new("actions/checkout", "v4");
        assert_eq!(action.name, "actions/checkout");
        assert_eq!(action.version_ref, "v4");
        assert!(!action.release.exists());
        assert!(action.upgrade_candidates.is_empty());
    }

    #[test]
    fn test_root_counts() {
        let mut root = Root::default();
        root.workflows
            .insert(PathBuf::from("a.yml"), make_workflow("a.yml", 2));
        root.workflows
            .insert(PathBuf::from("b.yml"), make_workflow("b.yml", 3));

        assert_eq!(root.workflow_count(), 2);
        assert_eq!(root.step_count(), 5);
    }

    #[test]
    fn test_root_iteration_is_sorted_by_path() {
        let mut root = Root::default();
        root.workflows
            .insert(PathBuf::from("z.yml"), make_workflow("z.yml", 0));
        root.workflows
            .insert(PathBuf::from("a.yml"), make_workflow("a.yml", 0));

        let keys: Vec<_> = root.workflows.keys().cloned().collect();
        assert_eq!(keys, vec![PathBuf::from("a.yml"), PathBuf::from("z.yml")]);
    }
}
