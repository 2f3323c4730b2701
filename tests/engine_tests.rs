//! End-to-end resolution and rewrite tests
//!
//! These tests drive the full scan → resolve → choose → rewrite
//! pipeline against real workflow files on disk, with version lookups
//! answered by an in-memory resolver instead of the GitHub API.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use ghpin::domain::{PinMode, Release, UpgradeCandidates};
use ghpin::engine::{Engine, EngineOptions};
use ghpin::error::GitHubError;
use ghpin::github::VersionResolver;
use ghpin::progress::ProgressLogger;
use ghpin::scanner::{self, ScanOptions};

/// Resolver answering from fixed in-memory tables.
#[derive(Default)]
struct StaticResolver {
    commits: HashMap<(String, String), String>,
    tags: HashMap<(String, String), Vec<String>>,
    candidates: HashMap<(String, String), UpgradeCandidates>,
}

#[async_trait]
impl VersionResolver for StaticResolver {
    async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<String, GitHubError> {
        self.commits
            .get(&(repo.to_string(), reference.to_string()))
            .cloned()
            .ok_or(GitHubError::RefNotFound {
                reference: reference.to_string(),
            })
    }

    async fn version_tags_for_commit(
        &self,
        repo: &str,
        commit: &str,
    ) -> Result<Vec<String>, GitHubError> {
        Ok(self
            .tags
            .get(&(repo.to_string(), commit.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn upgrade_candidates(
        &self,
        repo: &str,
        current: &Release,
    ) -> Result<UpgradeCandidates, GitHubError> {
        Ok(self
            .candidates
            .get(&(repo.to_string(), current.version.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

/// A resolver for `actions/checkout@v1.0.0` with upgrade candidates
/// v2.0.0 (latest) and v1.2.0 (latest compatible); every other repo
/// fails to resolve.
fn checkout_resolver() -> StaticResolver {
    let mut resolver = StaticResolver::default();
    resolver.commits.insert(
        ("actions/checkout".to_string(), "v1.0.0".to_string()),
        "differenthash".to_string(),
    );
    resolver.tags.insert(
        ("actions/checkout".to_string(), "differenthash".to_string()),
        vec!["v1.0.0".to_string()],
    );
    resolver.candidates.insert(
        ("actions/checkout".to_string(), "v1.0.0".to_string()),
        UpgradeCandidates {
            latest: Release::new("v2.0.0", "aaa111"),
            latest_compatible: Release::new("v1.2.0", "bbb222"),
        },
    );
    resolver
}

const WORKFLOW: &str = "\
name: CI
on: push
jobs:
  test:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v1.0.0
      - run: make test
";

fn write_workflow(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn make_engine(files: &[PathBuf], resolver: StaticResolver, strict: bool) -> Engine {
    let root = scanner::scan_workflows(files, &ScanOptions::default()).unwrap();
    Engine::new(
        root,
        Arc::new(resolver),
        Arc::new(ProgressLogger::disabled()),
        EngineOptions { workers: 2, strict },
    )
}

#[tokio::test]
async fn test_pin_compat_mode_rewrites_to_latest_compatible() {
    let dir = TempDir::new().unwrap();
    let path = write_workflow(&dir, "ci.yml", WORKFLOW);

    let mut engine = make_engine(&[path.clone()], checkout_resolver(), false);
    engine.pin(PinMode::Compat).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(
        content.contains("      - uses: actions/checkout@bbb222 # v1.2.0\n"),
        "unexpected content:\n{content}"
    );
    assert!(content.contains("      - run: make test\n"));
}

#[tokio::test]
async fn test_pin_latest_mode_rewrites_to_absolute_latest() {
    let dir = TempDir::new().unwrap();
    let path = write_workflow(&dir, "ci.yml", WORKFLOW);

    let mut engine = make_engine(&[path.clone()], checkout_resolver(), false);
    engine.pin(PinMode::Latest).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(
        content.contains("      - uses: actions/checkout@aaa111 # v2.0.0\n"),
        "unexpected content:\n{content}"
    );
}

#[tokio::test]
async fn test_pin_current_mode_pins_resolved_commit() {
    let dir = TempDir::new().unwrap();
    let path = write_workflow(&dir, "ci.yml", WORKFLOW);

    let mut engine = make_engine(&[path.clone()], checkout_resolver(), false);
    engine.pin(PinMode::Current).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(
        content.contains("      - uses: actions/checkout@differenthash # v1.0.0\n"),
        "unexpected content:\n{content}"
    );
}

#[tokio::test]
async fn test_lenient_pin_leaves_unresolvable_steps_alone() {
    let dir = TempDir::new().unwrap();
    let workflow = "\
steps:
  - uses: actions/checkout@v1.0.0
  - uses: missing/action@v9
";
    let path = write_workflow(&dir, "ci.yml", workflow);

    let mut engine = make_engine(&[path.clone()], checkout_resolver(), false);
    engine.pin(PinMode::Compat).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("  - uses: actions/checkout@bbb222 # v1.2.0\n"));
    // the unresolvable step keeps its original line verbatim
    assert!(content.contains("  - uses: missing/action@v9\n"));
}

#[tokio::test]
async fn test_strict_pin_fails_and_applies_no_partial_rewrite() {
    let dir = TempDir::new().unwrap();
    let workflow = "\
steps:
  - uses: actions/checkout@v1.0.0
  - uses: missing/action@v9
";
    let path = write_workflow(&dir, "ci.yml", workflow);

    let mut engine = make_engine(&[path.clone()], checkout_resolver(), true);
    let err = engine.pin(PinMode::Compat).await.unwrap_err();
    assert!(err.to_string().contains("failed to resolve actions"));

    // rewrite is gated on resolution: the file is untouched
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, workflow);
}

#[tokio::test]
async fn test_pin_spans_multiple_workflows() {
    let dir = TempDir::new().unwrap();
    let first = write_workflow(&dir, "ci.yml", WORKFLOW);
    let second = write_workflow(
        &dir,
        "release.yml",
        "steps:\n  - uses: actions/checkout@v1.0.0\n",
    );

    let mut engine = make_engine(&[first.clone(), second.clone()], checkout_resolver(), false);
    engine.pin(PinMode::Current).await.unwrap();

    for path in [&first, &second] {
        let content = fs::read_to_string(path).unwrap();
        assert!(
            content.contains("uses: actions/checkout@differenthash # v1.0.0"),
            "not pinned in {}:\n{content}",
            path.display()
        );
    }
}

#[tokio::test]
async fn test_list_reports_current_and_upgrade_versions() {
    colored::control::set_override(false);
    let dir = TempDir::new().unwrap();
    let path = write_workflow(&dir, "ci.yml", WORKFLOW);

    let mut engine = make_engine(&[path], checkout_resolver(), false);
    let mut out = Vec::new();
    engine.list(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("workflow ci.yml"));
    assert!(out.contains("action actions/checkout@v1.0.0 versions:"));
    assert!(out.contains("current: differenthash @ v1.0.0"));
    assert!(out.contains("compat:  bbb222 @ v1.2.0"));
    assert!(out.contains("latest:  aaa111 @ v2.0.0"));
}

#[tokio::test]
async fn test_list_marks_unresolvable_actions() {
    colored::control::set_override(false);
    let dir = TempDir::new().unwrap();
    let path = write_workflow(&dir, "ci.yml", "steps:\n  - uses: missing/action@v9\n");

    let mut engine = make_engine(&[path], checkout_resolver(), false);
    let mut out = Vec::new();
    engine.list(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("could not resolve action versions"));
}
