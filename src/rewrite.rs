//! Workflow rewriting
//!
//! Re-serializes resolved pins back into workflow files, touching only
//! the `uses:` lines that belong to scanned steps and preserving every
//! other byte, including original line endings. Files are replaced
//! atomically via a same-directory temp file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::{Release, Root, Step, Workflow};
use crate::error::RewriteError;

/// Rewrite every workflow in the root, asking the strategy which
/// release to pin for each step.
///
/// A step whose strategy yields an absent release is left untouched;
/// nothing ever resolved for it, and that is not an error.
pub fn rewrite_workflows<F>(root: &Root, strategy: F) -> Result<(), RewriteError>
where
    F: Fn(&Step) -> Release,
{
    for workflow in root.workflows.values() {
        rewrite_file(workflow, &strategy)?;
    }
    Ok(())
}

fn rewrite_file<F>(workflow: &Workflow, strategy: &F) -> Result<(), RewriteError>
where
    F: Fn(&Step) -> Release,
{
    let content =
        fs::read_to_string(&workflow.file_path).map_err(|source| RewriteError::Read {
            path: workflow.file_path.clone(),
            source,
        })?;

    let steps: HashMap<usize, &Step> = workflow
        .steps
        .iter()
        .map(|step| (step.line_number, step))
        .collect();

    let mut out = String::with_capacity(content.len());
    for (line_number, line) in content.split_inclusive('\n').enumerate() {
        let Some(step) = steps.get(&line_number) else {
            out.push_str(line);
            continue;
        };

        let pin = strategy(step);
        if !pin.exists() {
            out.push_str(line);
            continue;
        }

        let (body, eol) = split_eol(line);
        let Some((prefix, _)) = body.split_once("uses:") else {
            return Err(RewriteError::MissingUses {
                path: workflow.file_path.clone(),
                line: line_number,
                text: body.to_string(),
            });
        };

        out.push_str(prefix);
        out.push_str("uses: ");
        out.push_str(&step.action.name);
        out.push('@');
        out.push_str(&pin.commit_hash);
        // version hint comment: the resolved semver tag if known,
        // otherwise the original ref when it differs from the hash
        // being written
        if !pin.version.is_empty() {
            out.push_str(" # ");
            out.push_str(&pin.version);
        } else if step.action.version_ref != pin.commit_hash {
            out.push_str(" # ref:");
            out.push_str(&step.action.version_ref);
        }
        out.push_str(eol);
    }

    replace_file(&workflow.file_path, &out)
}

fn split_eol(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn replace_file(path: &Path, content: &str) -> Result<(), RewriteError> {
    let replace_error = |message: String| RewriteError::Replace {
        path: path.to_path_buf(),
        message,
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| replace_error(e.to_string()))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| replace_error(e.to_string()))?;
    // keep the original file's permissions rather than the temp file's
    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(tmp.path(), meta.permissions());
    }
    tmp.persist(path).map_err(|e| replace_error(e.to_string()))?;
    Ok(())
}
