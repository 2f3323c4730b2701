//! Pin mode selection

use std::fmt;

/// Policy selecting which release to write back when pinning a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Re-resolve the existing ref to its commit without seeking upgrades
    Current,
    /// Pin to the absolute latest release, falling back to current
    Latest,
    /// Pin to the latest release with the same major version, falling
    /// back to current
    Compat,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinMode::Current => write!(f, "current"),
            PinMode::Latest => write!(f, "latest"),
            PinMode::Compat => write!(f, "latest compatible"),
        }
    }
}
