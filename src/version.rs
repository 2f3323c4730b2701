//! Lenient semantic version handling for action tags
//!
//! Action version tags conventionally carry a leading `v` and are often
//! shorthand (`v4`, `v4.1`) rather than full semver (`v4.1.2`). This
//! module normalizes such tags onto the `semver` crate so they can be
//! compared with standard precedence rules.
//!
//! A tag without the leading `v` is not considered a version at all,
//! matching the convention used by action releases.

use std::cmp::Ordering;

use semver::{Prerelease, Version};

use crate::domain::Release;

/// Parse a `v`-prefixed version tag, tolerating shorthand forms.
///
/// Missing minor/patch components default to zero, so `v4` parses as
/// `4.0.0`. Build metadata is accepted but discarded since it does not
/// participate in precedence.
pub fn parse(tag: &str) -> Option<Version> {
    let rest = tag.strip_prefix('v')?;

    let (rest, _build) = match rest.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (rest, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let mut components = core.split('.');
    let major = components.next()?.parse().ok()?;
    let minor = match components.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    let patch = match components.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    if components.next().is_some() {
        return None;
    }

    let mut version = Version::new(major, minor, patch);
    if let Some(pre) = pre {
        version.pre = Prerelease::new(pre).ok()?;
    }
    Some(version)
}

/// Whether the tag is a syntactically valid version.
pub fn is_valid(tag: &str) -> bool {
    parse(tag).is_some()
}

/// Compare two tags by semver precedence. An invalid tag is considered
/// less than any valid one; two invalid tags compare equal.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Major version component of a valid tag.
pub fn major(tag: &str) -> Option<u64> {
    parse(tag).map(|v| v.major)
}

/// Whether the candidate version is equal to or newer than the current
/// version.
///
/// Equal versions count as upgrade candidates, which lets the selector
/// report "already at latest" by re-selecting the current release as its
/// own best candidate. A non-version current ref (e.g. a branch name) is
/// treated as strictly worse than any tagged release.
pub fn is_upgrade_candidate(current: &str, candidate: &str) -> bool {
    match (parse(current), parse(candidate)) {
        (Some(current), Some(candidate)) => current <= candidate,
        (None, Some(_)) => true,
        _ => false,
    }
}

/// Return whichever release has the greater version; ties favor `b`.
///
/// The tie direction matters: when a commit carries multiple tags at the
/// same effective version, the later-observed one wins.
pub fn choose_newer(a: Release, b: Release) -> Release {
    if compare(&a.version, &b.version) == Ordering::Greater {
        a
    } else {
        b
    }
}

/// Sort tags into descending version order, newest and most specific
/// first.
pub fn sort_descending(tags: &mut [String]) {
    tags.sort_by(|a, b| compare(a, b));
    tags.reverse();
}
