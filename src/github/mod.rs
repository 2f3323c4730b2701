//! GitHub version resolution
//!
//! This module provides:
//! - VersionResolver: the capability the engine depends on
//! - GitHubClient: the REST/GraphQL implementation with per-operation
//!   memoization
//! - Ref resolution order: commit hash (hex refs only), then branch,
//!   then tag with one level of annotated-tag dereference
//! - Lazily paginated release enumeration feeding the candidate
//!   selector

mod cache;
mod http;

pub use cache::Cache;
pub use http::ApiClient;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Release, UpgradeCandidates};
use crate::error::GitHubError;
use crate::selector::CandidateSelector;
use crate::version;

/// The three questions the engine needs answered about a repository.
///
/// Implementations are expected to be safe for concurrent use; the
/// engine calls them from many tasks at once.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Resolve a ref (commit hash, branch, or tag) to a full commit
    /// hash.
    async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<String, GitHubError>;

    /// All semver-valid tag names pointing at the given commit, newest
    /// and most specific first.
    async fn version_tags_for_commit(
        &self,
        repo: &str,
        commit: &str,
    ) -> Result<Vec<String>, GitHubError>;

    /// The best available upgrade candidates for the current release.
    async fn upgrade_candidates(
        &self,
        repo: &str,
        current: &Release,
    ) -> Result<UpgradeCandidates, GitHubError>;
}

type LookupCache<V> = Cache<(String, String), V, GitHubError>;

/// Client for GitHub's REST and GraphQL APIs, exposing the
/// functionality needed to resolve versions, commits, and refs.
///
/// Every lookup is memoized per (repo, parameter) pair, errors
/// included: a ref or repo known to fail is not retried within the same
/// process run.
pub struct GitHubClient {
    api: ApiClient,
    ref_cache: LookupCache<String>,
    tag_cache: LookupCache<Vec<String>>,
    upgrade_cache: LookupCache<UpgradeCandidates>,
}

impl GitHubClient {
    /// Create a new client authenticating with the given token.
    pub fn new(token: impl Into<String>) -> Result<Self, GitHubError> {
        Ok(Self {
            api: ApiClient::new(token)?,
            ref_cache: Cache::new(),
            tag_cache: Cache::new(),
            upgrade_cache: Cache::new(),
        })
    }

    /// Ensure the configured token is valid by fetching the
    /// authenticated user, returning their login.
    pub async fn validate_auth(&self) -> Result<String, GitHubError> {
        let user: UserResponse = self.api.get_json("/user").await?;
        Ok(user.login)
    }

    async fn fetch_commit_for_ref(
        &self,
        repo: &str,
        reference: &str,
    ) -> Result<String, GitHubError> {
        let (owner, name) = split_repo(repo)?;

        // The ref may be a (possibly shortened) commit hash, a branch
        // name, or a tag name; each interpretation is tried in that
        // order and the first successful lookup wins.
        if is_hex(reference) {
            if let Ok(commit) = self
                .api
                .get_json::<CommitResponse>(&format!("/repos/{owner}/{name}/commits/{reference}"))
                .await
            {
                return Ok(commit.sha);
            }
        }

        if let Ok(git_ref) = self
            .api
            .get_json::<RefResponse>(&format!("/repos/{owner}/{name}/git/ref/heads/{reference}"))
            .await
        {
            return Ok(git_ref.object.sha);
        }

        if let Ok(git_ref) = self
            .api
            .get_json::<RefResponse>(&format!("/repos/{owner}/{name}/git/ref/tags/{reference}"))
            .await
        {
            // lightweight tags point straight at a commit
            if git_ref.object.kind == "commit" {
                return Ok(git_ref.object.sha);
            }
            // annotated tags need one more hop to the tag object
            if let Ok(tag) = self
                .api
                .get_json::<RefResponse>(&format!(
                    "/repos/{owner}/{name}/git/tags/{}",
                    git_ref.object.sha
                ))
                .await
            {
                return Ok(tag.object.sha);
            }
        }

        Err(GitHubError::RefNotFound {
            reference: reference.to_string(),
        })
    }

    async fn fetch_version_tags(
        &self,
        repo: &str,
        commit: &str,
    ) -> Result<Vec<String>, GitHubError> {
        let (owner, name) = split_repo(repo)?;

        let mut tags = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let data: VersionTagsData = self
                .api
                .graphql(
                    VERSION_TAGS_QUERY,
                    json!({"owner": owner, "repo": name, "cursor": cursor}),
                )
                .await?;
            let refs = data.repository.refs;
            for node in refs.nodes {
                if !version::is_valid(&node.name) {
                    continue;
                }
                if node.target.points_at(commit) {
                    tags.push(node.name);
                }
            }
            if !refs.page_info.has_next_page {
                break;
            }
            cursor = refs.page_info.end_cursor;
        }
        version::sort_descending(&mut tags);
        Ok(tags)
    }

    async fn fetch_upgrade_candidates(
        &self,
        repo: &str,
        current: &Release,
    ) -> Result<UpgradeCandidates, GitHubError> {
        let (owner, name) = split_repo(repo)?;

        let mut selector = CandidateSelector::new(current);
        let mut cursor: Option<String> = None;
        'pages: loop {
            let data: ReleasesData = self
                .api
                .graphql(
                    RELEASES_QUERY,
                    json!({"owner": owner, "repo": name, "cursor": cursor}),
                )
                .await?;
            let releases = data.repository.releases;
            for node in releases.nodes {
                if selector.observe(node.into_release()).is_break() {
                    break 'pages;
                }
            }
            if !releases.page_info.has_next_page {
                break;
            }
            cursor = releases.page_info.end_cursor;
        }
        Ok(selector.finish())
    }
}

#[async_trait]
impl VersionResolver for GitHubClient {
    async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<String, GitHubError> {
        self.ref_cache
            .do_cached((repo.to_string(), reference.to_string()), || {
                self.fetch_commit_for_ref(repo, reference)
            })
            .await
    }

    async fn version_tags_for_commit(
        &self,
        repo: &str,
        commit: &str,
    ) -> Result<Vec<String>, GitHubError> {
        self.tag_cache
            .do_cached((repo.to_string(), commit.to_string()), || {
                self.fetch_version_tags(repo, commit)
            })
            .await
    }

    async fn upgrade_candidates(
        &self,
        repo: &str,
        current: &Release,
    ) -> Result<UpgradeCandidates, GitHubError> {
        // without a resolved semver version there is nothing to compare
        // candidates against, so bail before any network traffic
        if current.version.is_empty() {
            return Ok(UpgradeCandidates::default());
        }
        self.upgrade_cache
            .do_cached((repo.to_string(), current.version.clone()), || {
                self.fetch_upgrade_candidates(repo, current)
            })
            .await
    }
}

/// Split a repository identifier into exactly (owner, name), failing
/// validation before any network call is attempted.
fn split_repo(repo: &str) -> Result<(&str, &str), GitHubError> {
    let parts: Vec<&str> = repo.split('/').collect();
    match parts.as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(GitHubError::InvalidRepo {
            repo: repo.to_string(),
        }),
    }
}

static HEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Fa-f0-9]+$").unwrap());

fn is_hex(s: &str) -> bool {
    HEX_PATTERN.is_match(s)
}

const VERSION_TAGS_QUERY: &str = r#"
query ($owner: String!, $repo: String!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    refs(refPrefix: "refs/tags/", first: 100, after: $cursor) {
      nodes {
        name
        target {
          oid
          ... on Tag {
            target {
              oid
            }
          }
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}"#;

const RELEASES_QUERY: &str = r#"
query ($owner: String!, $repo: String!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    releases(first: 100, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes {
        tagName
        tag {
          target {
            oid
            ... on Tag {
              target {
                oid
              }
            }
          }
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}"#;

#[derive(Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct VersionTagsData {
    repository: VersionTagsRepository,
}

#[derive(Deserialize)]
struct VersionTagsRepository {
    refs: TagConnection,
}

#[derive(Deserialize)]
struct TagConnection {
    nodes: Vec<TagNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct TagNode {
    name: String,
    target: TagTarget,
}

/// Tag target, covering both lightweight tags (direct commit oid) and
/// annotated tags (nested target oid).
#[derive(Deserialize)]
struct TagTarget {
    oid: String,
    target: Option<InnerTarget>,
}

impl TagTarget {
    fn points_at(&self, commit: &str) -> bool {
        self.oid == commit || self.target.as_ref().is_some_and(|t| t.oid == commit)
    }

    fn commit_hash(self) -> String {
        match self.target {
            Some(inner) => inner.oid,
            None => self.oid,
        }
    }
}

#[derive(Deserialize)]
struct InnerTarget {
    oid: String,
}

#[derive(Deserialize)]
struct ReleasesData {
    repository: ReleasesRepository,
}

#[derive(Deserialize)]
struct ReleasesRepository {
    releases: ReleaseConnection,
}

#[derive(Deserialize)]
struct ReleaseConnection {
    nodes: Vec<ReleaseNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct ReleaseNode {
    #[serde(rename = "tagName")]
    tag_name: String,
    tag: Option<ReleaseTagRef>,
}

/// A release's `tag` ref wraps the tag target under a `target` field, per
/// the GraphQL `tag { target { oid ... } }` selection.
#[derive(Deserialize)]
struct ReleaseTagRef {
    target: TagTarget,
}

impl ReleaseNode {
    fn into_release(self) -> Release {
        let commit = self
            .tag
            .map(|t| t.target.commit_hash())
            .unwrap_or_default();
        Release::new(self.tag_name, commit)
    }
}
