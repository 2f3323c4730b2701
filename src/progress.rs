//! Phase progress and diagnostics for the resolution engine
//!
//! Provides visual feedback during a resolution pass using indicatif,
//! plus structured per-step diagnostics at four severities, accumulated
//! per workflow file and rendered as a grouped summary once a phase
//! completes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Something of note that happened while processing one step.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub action: String,
    pub message: String,
}

/// Progress reporter and diagnostic sink for the engine.
///
/// In fancy mode (a color-capable terminal, not verbose) per-step status
/// is shown as a single live-updating spinner line; otherwise every
/// event is logged as its own line. Warnings and errors are additionally
/// retained as diagnostics for the end-of-phase summary.
pub struct ProgressLogger {
    fancy: bool,
    verbose: bool,
    silent: bool,
    bar: Mutex<Option<ProgressBar>>,
    diagnostics: Mutex<BTreeMap<PathBuf, Vec<Diagnostic>>>,
}

impl ProgressLogger {
    pub fn new(fancy: bool, verbose: bool) -> Self {
        Self {
            fancy,
            verbose,
            silent: false,
            bar: Mutex::new(None),
            diagnostics: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a logger that emits nothing (for tests).
    pub fn disabled() -> Self {
        let mut logger = Self::new(false, false);
        logger.silent = true;
        logger
    }

    /// Log a header line marking a new phase.
    pub fn start_phase(&self, msg: &str) {
        if self.silent {
            return;
        }
        eprintln!("{}", msg.bold());
        if self.fancy {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("{spinner:.cyan} {msg}")
                    .expect("invalid template"),
            );
            spinner.enable_steady_tick(Duration::from_millis(80));
            *self.bar.lock().unwrap() = Some(spinner);
        }
    }

    /// Log a footer line marking the end of a phase.
    pub fn finish_phase(&self, msg: &str) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        if self.silent {
            return;
        }
        eprintln!("{}", msg.bold());
        eprintln!();
    }

    /// Info-level status for a specific workflow and action.
    pub fn phase_info(&self, workflow: &Path, action: &str, msg: &str) {
        self.log_status(Severity::Info, workflow, action, msg);
    }

    /// Warn-level status; also recorded as a diagnostic.
    pub fn phase_warn(&self, workflow: &Path, action: &str, msg: &str) {
        self.log_status(Severity::Warn, workflow, action, msg);
        self.add_diagnostic(Severity::Warn, workflow, action, msg);
    }

    /// Error-level status; also recorded as a diagnostic.
    pub fn phase_error(&self, workflow: &Path, action: &str, msg: &str) {
        self.log_status(Severity::Error, workflow, action, msg);
        self.add_diagnostic(Severity::Error, workflow, action, msg);
    }

    /// Debug logging, only emitted in verbose mode.
    pub fn debug(&self, msg: &str) {
        if self.verbose && !self.silent {
            eprintln!("{} {}", "DEBUG".dimmed(), msg);
        }
    }

    fn log_status(&self, severity: Severity, workflow: &Path, action: &str, msg: &str) {
        if self.silent {
            return;
        }
        let file = workflow
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| workflow.display().to_string());
        let status = match severity {
            Severity::Error => msg.red().to_string(),
            Severity::Warn => msg.yellow().to_string(),
            _ => msg.to_string(),
        };
        let line = format!("workflow={} action={} → {}", file.bold(), action.bold(), status);

        let bar = self.bar.lock().unwrap();
        match bar.as_ref() {
            Some(spinner) => spinner.set_message(line),
            None => eprintln!("{line}"),
        }
    }

    fn add_diagnostic(&self, severity: Severity, workflow: &Path, action: &str, msg: &str) {
        let mut diagnostics = self.diagnostics.lock().unwrap();
        diagnostics
            .entry(workflow.to_path_buf())
            .or_default()
            .push(Diagnostic {
                severity,
                action: action.to_string(),
                message: msg.to_string(),
            });
    }

    /// Render all diagnostics accumulated during the pass, grouped by
    /// workflow file, then clear them for the next phase.
    pub fn show_diagnostics(&self) {
        let mut diagnostics = self.diagnostics.lock().unwrap();
        if diagnostics.is_empty() {
            return;
        }
        if !self.silent {
            eprintln!("{}", "diagnostics".bold());
            for (path, records) in diagnostics.iter() {
                eprintln!("  {}", path.display().to_string().bold());
                for record in records {
                    let line = format!(
                        "    {:>5} {} → {}",
                        record.severity, record.action, record.message
                    );
                    let line = match record.severity {
                        Severity::Error => line.red().to_string(),
                        Severity::Warn => line.yellow().to_string(),
                        _ => line,
                    };
                    eprintln!("{line}");
                }
            }
            eprintln!();
        }
        diagnostics.clear();
    }

    /// Snapshot of the diagnostics recorded so far (for tests).
    pub fn diagnostics(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
        self.diagnostics.lock().unwrap().clone()
    }
}
