//! Core domain types for workflow scanning and version resolution
//!
//! This module provides:
//! - Release and UpgradeCandidates: resolved version information
//! - Action, Step, Workflow, Root: the scanned workflow tree
//! - PinMode: which release to write back when pinning

mod pin_mode;
mod release;
mod workflow;

pub use pin_mode::PinMode;
pub use release::{Release, UpgradeCandidates};
pub use workflow::{Action, Root, Step, Workflow};
