//! Resolved release information
//!
//! A Release pairs a semver tag with the commit it points at. Either
//! field may be empty: a step pinned to an untagged commit has a commit
//! hash but no version, and an unresolved step has neither.

use std::fmt;

/// A resolved point in a repository's history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Release {
    /// Semver tag name (e.g. `v4.1.2`), empty if the commit carries no
    /// version tag
    pub version: String,
    /// Full commit hash, empty if the ref could not be resolved
    pub commit_hash: String,
}

impl Release {
    /// Create a new Release
    pub fn new(version: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            commit_hash: commit_hash.into(),
        }
    }

    /// Whether this release has been populated at all
    pub fn exists(&self) -> bool {
        !self.version.is_empty() || !self.commit_hash.is_empty()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.version.is_empty() {
            write!(f, "{} @ {}", self.commit_hash, self.version)
        } else if !self.commit_hash.is_empty() {
            write!(f, "{}", self.commit_hash)
        } else {
            write!(f, "<unknown version>")
        }
    }
}

/// Possible upgrade versions for a resolved release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeCandidates {
    /// Absolute newest release, regardless of major version
    pub latest: Release,
    /// Newest release sharing the current major version, presumed to be
    /// compatible
    pub latest_compatible: Release,
}

impl UpgradeCandidates {
    /// Whether no candidate of either kind was found
    pub fn is_empty(&self) -> bool {
        !self.latest.exists() && !self.latest_compatible.exists()
    }
}
