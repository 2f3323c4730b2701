//! Workflow discovery and scanning
//!
//! This module provides:
//! - Discovery of workflow yaml files from explicit paths, directories,
//!   and the standard `.github/workflows` location
//! - Line-oriented scanning of `uses:` directives into Actions
//! - Select/exclude filtering with trailing-wildcard patterns

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Action, Root, Step, Workflow};
use crate::error::{ConfigError, ScanError};

/// Action selection filters applied while scanning.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Only include actions matching one of these patterns
    pub selects: Vec<String>,
    /// Exclude actions matching any of these patterns
    pub excludes: Vec<String>,
}

impl ScanOptions {
    fn includes(&self, name: &str) -> bool {
        if !self.selects.is_empty() && !self.selects.iter().any(|p| matches_pattern(p, name)) {
            return false;
        }
        !self.excludes.iter().any(|p| matches_pattern(p, name))
    }
}

/// Validate a select/exclude pattern: at most one wildcard, and only at
/// the very end.
pub fn validate_pattern(pattern: &str) -> Result<(), ConfigError> {
    let wildcards = pattern.matches('*').count();
    if wildcards > 1 {
        return Err(ConfigError::MultipleWildcards {
            pattern: pattern.to_string(),
        });
    }
    if wildcards == 1 && !pattern.ends_with('*') {
        return Err(ConfigError::WildcardNotAtEnd {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Find workflow yaml files for the given paths.
///
/// With no paths, looks in the standard location under the current
/// directory. A directory path contributes its own yaml files, plus the
/// standard workflow location when it is a repository root.
pub fn find_workflows(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    if paths.is_empty() {
        return Ok(workflows_in_repo(Path::new(".")));
    }

    let mut files = Vec::new();
    for path in paths {
        let info = fs::metadata(path).map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        if info.is_dir() {
            if path.join(".git").is_dir() {
                files.extend(workflows_in_repo(path));
            }
            files.extend(workflows_in_dir(path));
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn workflows_in_repo(root: &Path) -> Vec<PathBuf> {
    workflows_in_dir(&root.join(".github").join("workflows"))
}

fn workflows_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        // a missing workflow dir just means there is nothing to do
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yml" | "yaml")
            )
        })
        .collect();
    files.sort();
    files
}

/// Walk the given files and parse them into a tree of workflows and
/// steps.
pub fn scan_workflows(files: &[PathBuf], opts: &ScanOptions) -> Result<Root, ScanError> {
    let mut root = Root::default();
    for file in files {
        let workflow = scan_file(file, opts)?;
        root.workflows.insert(file.clone(), workflow);
    }
    Ok(root)
}

fn scan_file(path: &Path, opts: &ScanOptions) -> Result<Workflow, ScanError> {
    let content = fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut steps = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        let Some(action) = parse_action_line(line) else {
            continue;
        };
        if !opts.includes(&action.name) {
            continue;
        }
        steps.push(Step {
            line_number,
            action,
        });
    }
    Ok(Workflow {
        file_path: path.to_path_buf(),
        steps,
    })
}

static USES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-?\s*uses:\s*([\w\-]+/[\w\-]+)@([\w\-\./]+)(?:\s*#.*)?$").unwrap()
});

fn parse_action_line(line: &str) -> Option<Action> {
    let captures = USES_PATTERN.captures(line)?;
    Some(Action::new(&captures[1], &captures[2]))
}
