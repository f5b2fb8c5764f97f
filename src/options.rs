//! Installer configuration.
//!
//! This module provides the [`InstallerOptions`] struct for configuring an
//! [`Installer`](crate::Installer) from code or from a deserialized
//! configuration file.

use crate::InstallerFlags;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration options for an installation run.
///
/// # Default Behavior
///
/// The default root is the empty path, so every step path resolves relative
/// to the current working directory, and no flags are set.
///
/// # Example
///
/// ```rust
/// use winstall::{InstallerFlags, InstallerOptions};
///
/// let opts = InstallerOptions {
///     root: "C:\\Program Files\\App".into(),
///     ..Default::default()
/// };
/// assert!(opts.flags.is_empty());
///
/// let opts = InstallerOptions {
///     flags: InstallerFlags::FORCE_INSTALL,
///     ..opts
/// };
/// assert!(opts.flags.force_install());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerOptions {
    /// Base directory that step paths are joined onto.
    pub root: PathBuf,

    /// Flags for the run.
    ///
    /// Default: empty
    pub flags: InstallerFlags,
}
