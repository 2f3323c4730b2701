//! Application error types using thiserror
//!
//! Error hierarchy:
//! - GitHubError: GitHub API communication and lookup failures
//! - ResolveError: per-step resolution failures, tagged with the phase
//! - StepError: a ResolveError plus the workflow/action it belongs to
//! - EngineError: overall resolution/rewrite/report failures
//! - ScanError: workflow discovery and scanning failures
//! - ConfigError: CLI configuration validation failures

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the GitHub API client.
///
/// These are cloneable so that a failed lookup can be memoized and
/// handed to every caller of the same cache key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitHubError {
    /// Repository identifier did not split into `owner/repo`
    #[error("repository must be specified in \"owner/repo\" format, got \"{repo}\"")]
    InvalidRepo { repo: String },

    /// Ref was not a known commit, branch, or tag
    #[error("failed to resolve reference {reference}")]
    RefNotFound { reference: String },

    /// HTTP 401
    #[error("invalid auth token")]
    InvalidAuthToken,

    /// HTTP 403
    #[error("access denied")]
    AccessDenied,

    /// Request never produced a response
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Unexpected HTTP status
    #[error("http error: {status}")]
    Http { status: u16 },

    /// GraphQL query-level errors
    #[error("graphql error: {message}")]
    GraphQl { message: String },

    /// Response body could not be decoded
    #[error("failed to decode response: {message}")]
    InvalidResponse { message: String },
}

/// A single step's resolution failure, tagged with the phase it failed
/// in so diagnostics stay actionable.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("failed to resolve commit hash for ref {reference}: {source}")]
    Ref {
        reference: String,
        #[source]
        source: GitHubError,
    },

    #[error("failed to fetch version tags for resolved commit {commit}: {source}")]
    Tags {
        commit: String,
        #[source]
        source: GitHubError,
    },
}

/// A ResolveError carrying the workflow and action it originated from.
#[derive(Error, Debug, Clone)]
#[error("{action}@{reference} in {}: {source}", .workflow.display())]
pub struct StepError {
    pub workflow: PathBuf,
    pub action: String,
    pub reference: String,
    #[source]
    pub source: ResolveError,
}

/// Overall failure of an engine operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to resolve actions: {0}")]
    Resolution(#[from] StepError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

/// Errors from rewriting workflow files in place.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to read workflow {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected `uses:` declaration on line {line} of {path}, got {text:?}")]
    MissingUses {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("failed to atomically replace {path}: {message}")]
    Replace { path: PathBuf, message: String },
}

/// Errors from workflow discovery and scanning.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// CLI configuration validation failures, surfaced before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("either --github-token/-g flag or GITHUB_TOKEN env var are required")]
    MissingToken,

    #[error("wildcards are only supported at the end of patterns, got: {pattern:?}")]
    WildcardNotAtEnd { pattern: String },

    #[error("multiple wildcards not supported, got: {pattern:?}")]
    MultipleWildcards { pattern: String },

    #[error("invalid {flag} pattern: {source}")]
    InvalidPattern {
        flag: &'static str,
        #[source]
        source: Box<ConfigError>,
    },
}
