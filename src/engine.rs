//! Resolution engine
//!
//! Coordinates the version upgrade process: resolving every step's
//! current ref to a commit and semver tag, optionally fetching upgrade
//! candidates, then driving the list report or the workflow rewrite.
//!
//! Steps across all workflows are flattened into one task pool bounded
//! by a semaphore. Each task owns exactly one step's resolution and
//! returns its results keyed by (workflow, step index); the engine
//! merges them back into the Root once the pool drains, so no two tasks
//! ever touch the same step.

use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::domain::{Action, PinMode, Release, Root, Step, UpgradeCandidates};
use crate::error::{EngineError, ResolveError, StepError};
use crate::github::VersionResolver;
use crate::progress::ProgressLogger;
use crate::report;
use crate::rewrite;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Worker budget for concurrent resolution (minimum 1)
    pub workers: usize,
    /// Abort the whole run on the first step failure instead of
    /// continuing past it
    pub strict: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            strict: false,
        }
    }
}

/// Manages the version upgrade process, from resolving current versions
/// to choosing upgrade candidates to applying upgrades.
pub struct Engine {
    root: Root,
    resolver: Arc<dyn VersionResolver>,
    workers: usize,
    strict: bool,
    log: Arc<ProgressLogger>,
}

impl Engine {
    pub fn new(
        root: Root,
        resolver: Arc<dyn VersionResolver>,
        log: Arc<ProgressLogger>,
        opts: EngineOptions,
    ) -> Self {
        Self {
            root,
            resolver,
            workers: opts.workers.max(1),
            strict: opts.strict,
            log,
        }
    }

    /// The workflow tree, with resolution results merged in after a
    /// resolution pass.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// List each step in each workflow, with the current action version
    /// and any available upgrades.
    pub async fn list(&mut self, dst: &mut dyn io::Write) -> Result<(), EngineError> {
        self.resolve_steps(PinMode::Latest).await?;
        report::render(&self.root, dst)?;
        Ok(())
    }

    /// Rewrite each workflow's steps from mutable tags/branches to
    /// immutable commit hashes, choosing the release per the pin mode.
    pub async fn pin(&mut self, mode: PinMode) -> Result<(), EngineError> {
        self.resolve_steps(mode).await?;
        self.log.start_phase(&format!(
            "pinning {} action(s) to immutable hashes for their {} versions in {} workflow(s) ...",
            self.root.step_count(),
            mode,
            self.root.workflow_count()
        ));
        rewrite::rewrite_workflows(&self.root, |step| choose_upgrade(step, mode))?;
        self.log.finish_phase("done!");
        Ok(())
    }

    /// Walk the set of workflows and resolve each step's current ref to
    /// a concrete commit hash and semver tag, optionally fetching its
    /// potential upgrade candidates.
    async fn resolve_steps(&mut self, mode: PinMode) -> Result<(), EngineError> {
        self.log.start_phase(&format!(
            "resolving action versions for {} step(s) across {} workflow(s) with {} workers ...",
            self.root.step_count(),
            self.root.workflow_count(),
            self.workers
        ));

        // resolving up to two different upgrade versions is extra work
        // we can skip when only the current versions matter (e.g. `pin`)
        let fetch_upgrades = mode != PinMode::Current;

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        for (path, workflow) in &self.root.workflows {
            for (index, step) in workflow.steps.iter().enumerate() {
                let resolver = Arc::clone(&self.resolver);
                let log = Arc::clone(&self.log);
                let semaphore = Arc::clone(&semaphore);
                let mut cancel = cancel_rx.clone();
                let workflow_path = path.clone();
                let action = step.action.clone();
                tasks.spawn(async move {
                    // a worker slot may never arrive once shutdown has
                    // started; bail out quietly so the triggering error
                    // is the one reported, not an uninformative
                    // cancellation
                    let _permit = tokio::select! {
                        _ = cancel.changed() => return TaskOutcome::Cancelled,
                        permit = semaphore.acquire_owned() => permit.expect("semaphore closed"),
                    };
                    let result = tokio::select! {
                        _ = cancel.changed() => None,
                        result = resolve_action(
                            resolver.as_ref(),
                            &log,
                            &workflow_path,
                            &action,
                            fetch_upgrades,
                        ) => Some(result),
                    };
                    match result {
                        None => TaskOutcome::Cancelled,
                        Some(Ok(resolved)) => TaskOutcome::Resolved {
                            workflow: workflow_path,
                            index,
                            resolved,
                        },
                        Some(Err(err)) => TaskOutcome::Failed(err),
                    }
                });
            }
        }

        let mut first_error: Option<StepError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.expect("resolver task panicked") {
                TaskOutcome::Resolved {
                    workflow,
                    index,
                    resolved,
                } => {
                    let step = self
                        .root
                        .workflows
                        .get_mut(&workflow)
                        .map(|w| &mut w.steps[index])
                        .expect("outcome for unknown workflow");
                    step.action.release = resolved.release;
                    step.action.upgrade_candidates = resolved.candidates;
                }
                TaskOutcome::Failed(err) => {
                    self.log
                        .phase_error(&err.workflow, &err.action, &err.source.to_string());
                    if self.strict && first_error.is_none() {
                        let _ = cancel_tx.send(true);
                        first_error = Some(err);
                    }
                }
                TaskOutcome::Cancelled => {}
            }
        }

        if let Some(err) = first_error {
            return Err(EngineError::Resolution(err));
        }

        self.log.finish_phase("done!");
        self.log.show_diagnostics();
        Ok(())
    }
}

enum TaskOutcome {
    Resolved {
        workflow: std::path::PathBuf,
        index: usize,
        resolved: ResolvedAction,
    },
    Failed(StepError),
    Cancelled,
}

struct ResolvedAction {
    release: Release,
    candidates: UpgradeCandidates,
}

/// Resolve a single action's ref to a concrete commit hash and semver
/// tag where possible, and optionally fetch its upgrade candidates.
async fn resolve_action(
    resolver: &dyn VersionResolver,
    log: &ProgressLogger,
    workflow: &Path,
    action: &Action,
    fetch_upgrades: bool,
) -> Result<ResolvedAction, StepError> {
    let step_error = |source: ResolveError| StepError {
        workflow: workflow.to_path_buf(),
        action: action.name.clone(),
        reference: action.version_ref.clone(),
        source,
    };

    // 1. resolve the version ref (commit, branch, tag) to a specific
    // commit hash
    log.phase_info(
        workflow,
        &action.name,
        &format!("resolving commit hash for ref {}", action.version_ref),
    );
    let commit = resolver
        .resolve_ref(&action.name, &action.version_ref)
        .await
        .map_err(|source| {
            step_error(ResolveError::Ref {
                reference: action.version_ref.clone(),
                source,
            })
        })?;

    // 2. find any semver tags pointing at the resolved commit hash
    log.phase_info(
        workflow,
        &action.name,
        &format!("resolving semver tags for commit hash {commit}"),
    );
    let tags = resolver
        .version_tags_for_commit(&action.name, &commit)
        .await
        .map_err(|source| {
            step_error(ResolveError::Tags {
                commit: commit.clone(),
                source,
            })
        })?;

    // A commit may carry several version tags (e.g. v4, v4.1, v4.1.2);
    // they arrive sorted newest-first, so the first is the best one. A
    // commit with no version tag at all is fine too: the release keeps
    // an empty version and every downstream consumer handles that.
    let version = tags.into_iter().next().unwrap_or_default();
    let release = Release {
        version,
        commit_hash: commit,
    };

    // 3. (optionally) fetch potential upgrade candidates for the
    // current release
    let mut candidates = UpgradeCandidates::default();
    if fetch_upgrades {
        log.phase_info(
            workflow,
            &action.name,
            &format!("finding upgrade candidates for version {}", release.version),
        );
        match resolver.upgrade_candidates(&action.name, &release).await {
            Ok(found) => {
                if found.is_empty() {
                    log.phase_warn(
                        workflow,
                        &action.name,
                        &format!("no upgrade candidates found for version {}", release.version),
                    );
                }
                candidates = found;
            }
            // failing to find upgrades never fails the step: it keeps
            // its resolved release and simply reports no candidates
            Err(err) => log.phase_error(
                workflow,
                &action.name,
                &format!(
                    "failed to get upgrade candidates for version {}: {err}",
                    release.version
                ),
            ),
        }
    }

    Ok(ResolvedAction {
        release,
        candidates,
    })
}

/// Choose the best available release from among the step's current
/// version and its two upgrade candidates, based on the pin mode.
///
/// When the mode's preferred candidate was not resolved, fall back to
/// the current release.
pub fn choose_upgrade(step: &Step, mode: PinMode) -> Release {
    let candidates = &step.action.upgrade_candidates;
    match mode {
        PinMode::Compat if candidates.latest_compatible.exists() => {
            candidates.latest_compatible.clone()
        }
        PinMode::Latest if candidates.latest.exists() => candidates.latest.clone(),
        _ => step.action.release.clone(),
    }
}
