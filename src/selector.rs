//! Upgrade candidate selection over a lazily produced release stream
//!
//! The selector is fed one candidate at a time so the caller can keep
//! fetching pages only while the selector wants more, preserving the
//! early-exit behavior across page boundaries.

use std::ops::ControlFlow;

use crate::domain::{Release, UpgradeCandidates};
use crate::version;

/// Tracks the best upgrade candidates seen so far for a current release.
///
/// Candidates are assumed to arrive in roughly descending version order;
/// the first candidate older than the current version stops consumption.
#[derive(Debug)]
pub struct CandidateSelector {
    current_version: String,
    current_major: Option<u64>,
    latest: Release,
    latest_compatible: Release,
}

impl CandidateSelector {
    pub fn new(current: &Release) -> Self {
        Self {
            current_version: current.version.clone(),
            current_major: version::major(&current.version),
            latest: Release::default(),
            latest_compatible: Release::default(),
        }
    }

    /// Feed one candidate. Returns `Break` once a candidate older than
    /// the current version is seen, signalling the caller to stop
    /// producing more.
    pub fn observe(&mut self, candidate: Release) -> ControlFlow<()> {
        if !version::is_upgrade_candidate(&self.current_version, &candidate.version) {
            return ControlFlow::Break(());
        }
        if version::major(&candidate.version) == self.current_major {
            self.latest_compatible =
                version::choose_newer(std::mem::take(&mut self.latest_compatible), candidate.clone());
        }
        self.latest = version::choose_newer(std::mem::take(&mut self.latest), candidate);
        ControlFlow::Continue(())
    }

    pub fn finish(self) -> UpgradeCandidates {
        UpgradeCandidates {
            latest: self.latest,
            latest_compatible: self.latest_compatible,
        }
    }
}

/// Select upgrade candidates from an in-memory candidate sequence.
///
/// A current release with no resolved version yields empty candidates
/// without consuming the sequence at all.
pub fn select_candidates<I>(current: &Release, candidates: I) -> UpgradeCandidates
where
    I: IntoIterator<Item = Release>,
{
    if current.version.is_empty() {
        return UpgradeCandidates::default();
    }
    let mut selector = CandidateSelector::new(current);
    for candidate in candidates {
        if selector.observe(candidate).is_break() {
            break;
        }
    }
    selector.finish()
}
