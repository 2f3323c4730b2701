//! ghpin - GitHub Actions version pinning CLI tool
//!
//! Resolves the symbolic version refs of third-party actions referenced
//! by workflow files, lists available upgrades, and rewrites workflows
//! to pin actions to immutable commit hashes.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use ghpin::cli::{Cli, ColorChoice};
use ghpin::engine::{Engine, EngineOptions};
use ghpin::github::GitHubClient;
use ghpin::progress::ProgressLogger;
use ghpin::scanner;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let common = cli.command.common();
    let mode = cli.command.pin_mode();

    // validate configuration before any network traffic
    common.validate()?;
    match common.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    let verbose = common.verbose_enabled();
    let token = common.resolve_token()?;

    // ensure our auth token is valid
    let client = GitHubClient::new(token)?;
    let login = client
        .validate_auth()
        .await
        .map_err(|e| anyhow::anyhow!("GitHub authentication failed: {e}"))?;
    if verbose {
        eprintln!(
            "ghpin v{}: authenticated as {}",
            env!("CARGO_PKG_VERSION"),
            login
        );
    }

    // find workflow files to work on
    let files = scanner::find_workflows(&common.paths)?;
    if files.is_empty() {
        eprintln!("warning: no workflows found");
        return Ok(ExitCode::SUCCESS);
    }

    // scan workflow files for action steps to manage
    let root = scanner::scan_workflows(&files, &common.scan_options())?;

    let log = Arc::new(ProgressLogger::new(
        fancy_output(common.color, verbose),
        verbose,
    ));
    let mut engine = Engine::new(
        root,
        Arc::new(client),
        log,
        EngineOptions {
            workers: common.workers,
            strict: common.strict,
        },
    );

    match mode {
        None => {
            let mut stdout = io::stdout().lock();
            engine.list(&mut stdout).await?;
        }
        Some(mode) => engine.pin(mode).await?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Decide when to enable "fancy" single-line progress output.
fn fancy_output(color: ColorChoice, verbose: bool) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        // verbose logging and in-place updates don't mix
        ColorChoice::Auto => !verbose && io::stderr().is_terminal(),
    }
}
