//! CLI argument parsing module for ghpin

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::domain::PinMode;
use crate::error::ConfigError;
use crate::scanner::{self, ScanOptions};

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// ghpin manages version pinning and upgrades for GitHub Actions
/// workflows.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ghpin",
    version,
    about = "Manages version pinning and upgrades for GitHub Actions workflows",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List current action versions and available upgrades
    List {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Pin current action versions to immutable commit hashes
    Pin {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Upgrade and re-pin action versions according to --mode
    #[command(long_about = "Upgrade and re-pin action versions according to --mode.

Available modes:
  --mode=compat (default)
      chooses the newest release with the same major version
      as the action's current version

  --mode=latest
      chooses the newest release regardless of major version")]
    Upgrade {
        /// Upgrade mode
        #[arg(short, long, value_enum, default_value_t = UpgradeMode::Compat)]
        mode: UpgradeMode,

        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Command {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Command::List { common } => common,
            Command::Pin { common } => common,
            Command::Upgrade { common, .. } => common,
        }
    }

    /// The pin mode driving a rewrite, or None for the list report.
    pub fn pin_mode(&self) -> Option<PinMode> {
        match self {
            Command::List { .. } => None,
            Command::Pin { .. } => Some(PinMode::Current),
            Command::Upgrade { mode, .. } => Some((*mode).into()),
        }
    }
}

/// Upgrade policy selectable on the `upgrade` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeMode {
    /// Newest release sharing the current major version
    Compat,
    /// Newest release regardless of major version
    Latest,
}

impl From<UpgradeMode> for PinMode {
    fn from(mode: UpgradeMode) -> Self {
        match mode {
            UpgradeMode::Compat => PinMode::Compat,
            UpgradeMode::Latest => PinMode::Latest,
        }
    }
}

/// When to emit colored/fancy output.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Arguments shared by every subcommand that resolves action versions.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Workflow files or directories to operate on (default: the
    /// current repo's workflows)
    pub paths: Vec<PathBuf>,

    /// GitHub access token (default: GITHUB_TOKEN env value)
    #[arg(short = 'g', long)]
    pub github_token: Option<String>,

    /// Select specific actions, with optional trailing wildcard
    /// (e.g. --select "actions/*" --select codecov/codecov-action)
    #[arg(short, long, action = ArgAction::Append)]
    pub select: Vec<String>,

    /// Exclude specific actions, with optional trailing wildcard
    /// (e.g. --exclude "actions/*")
    #[arg(short, long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Limit parallelism when accessing the GitHub API
    #[arg(short, long, default_value_t = default_workers())]
    pub workers: usize,

    /// Strict mode, abort on any error
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// When to output colored escape sequences
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

impl CommonArgs {
    /// Validate select/exclude patterns before any I/O happens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.select {
            scanner::validate_pattern(pattern).map_err(|source| ConfigError::InvalidPattern {
                flag: "--select",
                source: Box::new(source),
            })?;
        }
        for pattern in &self.exclude {
            scanner::validate_pattern(pattern).map_err(|source| ConfigError::InvalidPattern {
                flag: "--exclude",
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// The GitHub token from the flag, falling back to the environment.
    pub fn resolve_token(&self) -> Result<String, ConfigError> {
        self.resolve_token_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_token_with(
        &self,
        getenv: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        if let Some(token) = &self.github_token {
            if !token.is_empty() {
                return Ok(token.clone());
            }
        }
        match getenv("GITHUB_TOKEN") {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken),
        }
    }

    /// Whether verbose logging is on, honoring the VERBOSE env var as
    /// well as the flag.
    pub fn verbose_enabled(&self) -> bool {
        self.verbose_enabled_with(|key| std::env::var(key).ok())
    }

    pub fn verbose_enabled_with(&self, getenv: impl Fn(&str) -> Option<String>) -> bool {
        if self.verbose {
            return true;
        }
        matches!(
            getenv("VERBOSE").as_deref(),
            Some(value) if !value.is_empty() && value != "0" && value != "false"
        )
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            selects: self.select.clone(),
            excludes: self.exclude.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_list_defaults() {
        let cli = parse(&["ghpin", "list"]);
        let common = cli.command.common();
        assert!(common.paths.is_empty());
        assert!(common.github_token.is_none());
        assert!(common.select.is_empty());
        assert!(common.exclude.is_empty());
        assert!(common.workers >= 1);
        assert!(!common.strict);
        assert!(!common.verbose);
        assert_eq!(common.color, ColorChoice::Auto);
        assert_eq!(cli.command.pin_mode(), None);
    }

    #[test]
    fn test_pin_uses_current_mode() {
        let cli = parse(&["ghpin", "pin"]);
        assert_eq!(cli.command.pin_mode(), Some(PinMode::Current));
    }

    #[test]
    fn test_upgrade_default_mode_is_compat() {
        let cli = parse(&["ghpin", "upgrade"]);
        assert_eq!(cli.command.pin_mode(), Some(PinMode::Compat));
    }

    #[test]
    fn test_upgrade_latest_mode() {
        let cli = parse(&["ghpin", "upgrade", "--mode", "latest"]);
        assert_eq!(cli.command.pin_mode(), Some(PinMode::Latest));

        let cli = parse(&["ghpin", "upgrade", "-m", "compat"]);
        assert_eq!(cli.command.pin_mode(), Some(PinMode::Compat));
    }

    #[test]
    fn test_upgrade_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["ghpin", "upgrade", "--mode", "invalid"]).is_err());
    }

    #[test]
    fn test_invalid_color_rejected() {
        assert!(Cli::try_parse_from(["ghpin", "list", "--color", "invalid"]).is_err());
    }

    #[test]
    fn test_paths_and_flags() {
        let cli = parse(&[
            "ghpin",
            "pin",
            ".github/workflows/ci.yml",
            "-g",
            "token123",
            "--select",
            "actions/*",
            "-e",
            "codecov/codecov-action",
            "-w",
            "4",
            "--strict",
            "-v",
            "--color",
            "never",
        ]);
        let common = cli.command.common();
        assert_eq!(common.paths, vec![PathBuf::from(".github/workflows/ci.yml")]);
        assert_eq!(common.github_token.as_deref(), Some("token123"));
        assert_eq!(common.select, vec!["actions/*"]);
        assert_eq!(common.exclude, vec!["codecov/codecov-action"]);
        assert_eq!(common.workers, 4);
        assert!(common.strict);
        assert!(common.verbose);
        assert_eq!(common.color, ColorChoice::Never);
    }

    #[test]
    fn test_select_and_exclude_append() {
        let cli = parse(&[
            "ghpin", "list", "-s", "a/b", "-s", "c/d", "-e", "e/f", "-e", "g/h",
        ]);
        let common = cli.command.common();
        assert_eq!(common.select, vec!["a/b", "c/d"]);
        assert_eq!(common.exclude, vec!["e/f", "g/h"]);
    }

    #[test]
    fn test_validate_rejects_bad_select_pattern() {
        let cli = parse(&["ghpin", "pin", "--select", "*/invalid"]);
        let err = cli.command.common().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid --select pattern: wildcards are only supported at the end of patterns, got: \"*/invalid\""
        );
    }

    #[test]
    fn test_validate_rejects_bad_exclude_pattern() {
        let cli = parse(&["ghpin", "pin", "--exclude", "actions/*/*/*"]);
        let err = cli.command.common().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid --exclude pattern: multiple wildcards not supported, got: \"actions/*/*/*\""
        );
    }

    #[test]
    fn test_validate_accepts_good_patterns() {
        let cli = parse(&[
            "ghpin",
            "pin",
            "--select",
            "actions/*",
            "--exclude",
            "codecov/codecov-action",
        ]);
        assert!(cli.command.common().validate().is_ok());
    }

    #[test]
    fn test_resolve_token_prefers_flag() {
        let cli = parse(&["ghpin", "list", "-g", "from-flag"]);
        let token = cli
            .command
            .common()
            .resolve_token_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(token, "from-flag");
    }

    #[test]
    fn test_resolve_token_falls_back_to_env() {
        let cli = parse(&["ghpin", "list"]);
        let token = cli
            .command
            .common()
            .resolve_token_with(|key| (key == "GITHUB_TOKEN").then(|| "from-env".to_string()))
            .unwrap();
        assert_eq!(token, "from-env");
    }

    #[test]
    fn test_resolve_token_missing() {
        let cli = parse(&["ghpin", "list"]);
        let err = cli
            .command
            .common()
            .resolve_token_with(|_| None)
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn test_verbose_env_fallback() {
        let cli = parse(&["ghpin", "list"]);
        let common = cli.command.common();
        assert!(common.verbose_enabled_with(|_| Some("1".to_string())));
        assert!(!common.verbose_enabled_with(|_| Some("0".to_string())));
        assert!(!common.verbose_enabled_with(|_| Some("false".to_string())));
        assert!(!common.verbose_enabled_with(|_| None));

        let cli = parse(&["ghpin", "list", "-v"]);
        assert!(cli.command.common().verbose_enabled_with(|_| None));
    }

    #[test]
    fn test_scan_options_from_args() {
        let cli = parse(&["ghpin", "list", "-s", "actions/*", "-e", "actions/cache"]);
        let opts = cli.command.common().scan_options();
        assert_eq!(opts.selects, vec!["actions/*"]);
        assert_eq!(opts.excludes, vec!["actions/cache"]);
    }
}
