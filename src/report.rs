//! List report rendering
//!
//! Human-readable display of each workflow's steps with their current
//! resolved versions and any available upgrades. Workflows render in
//! path order; steps render in file order.

use std::io::{self, Write};

use colored::Colorize;

use crate::domain::Root;

pub fn render(root: &Root, dst: &mut dyn Write) -> io::Result<()> {
    let mut first = true;
    for workflow in root.workflows.values() {
        if workflow.steps.is_empty() {
            continue;
        }
        if !first {
            writeln!(dst)?;
        }
        first = false;

        let name = workflow
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| workflow.file_path.display().to_string());
        writeln!(dst, "workflow {}", name.bold())?;

        for step in &workflow.steps {
            let current = &step.action.release;
            let candidates = &step.action.upgrade_candidates;
            writeln!(
                dst,
                "  action {} versions:",
                format!("{}@{}", step.action.name, step.action.version_ref).bold()
            )?;
            if !current.exists() {
                writeln!(
                    dst,
                    "{}",
                    "    (could not resolve action versions, unable to pin or upgrade)".yellow()
                )?;
                continue;
            }
            writeln!(dst, "    current: {current}")?;
            if candidates.is_empty() {
                writeln!(dst, "    (no upgrade versions found)")?;
                continue;
            }
            if candidates.latest == *current {
                writeln!(dst, "{}", "    ✓ already using latest version".green())?;
                continue;
            }
            if candidates.latest_compatible.exists() {
                if candidates.latest_compatible == *current {
                    writeln!(
                        dst,
                        "    compat:  {}",
                        "✓ already using latest compat version".green()
                    )?;
                } else {
                    writeln!(dst, "    compat:  {}", candidates.latest_compatible)?;
                }
            }
            if candidates.latest.exists() {
                writeln!(dst, "    latest:  {}", candidates.latest)?;
            }
        }
    }
    Ok(())
}
