//! Error types for installation runs.
//!
//! [`StepError`] is what a single step reports. [`InstallError`] is what a
//! run reports: the first failure, annotated with where it happened. Every
//! [`InstallError`] carries an actionable fix suggestion.

use super::StepKind;
use crate::privilege::ElevationError;
use crate::system::RegistryError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by caller-supplied installation checks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by an individual step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepError {
    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file to copy does not exist.
    #[error("source file {} does not exist", path.display())]
    MissingSource { path: PathBuf },

    /// The reader factory of a streamed file failed.
    #[error("failed to get reader for {}: {source}", path.display())]
    ReaderFactory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A registry key exists but could not be opened.
    #[error("failed to open key {path}: {source}")]
    KeyOpen {
        path: String,
        #[source]
        source: RegistryError,
    },

    /// A registry key could not be created or opened for writing.
    #[error("failed to create key {path}: {source}")]
    KeyCreate {
        path: String,
        #[source]
        source: RegistryError,
    },

    /// Reading or writing a declared registry value failed.
    #[error("failed to access value {value}: {source}")]
    Registry {
        value: String,
        #[source]
        source: RegistryError,
    },

    /// The shell could not create a shortcut.
    #[error("failed to create shortcut {}: {source}", link.display())]
    Shortcut {
        link: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A command's program could not be resolved.
    #[error("failed to find {program}: {source}")]
    ProgramNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    /// A command could not be started.
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A command ran and exited unsuccessfully.
    #[error("{} exited with code {exit_code:?}", program.display())]
    CommandFailed {
        program: PathBuf,
        exit_code: Option<i32>,
    },

    /// A caller-supplied installation check failed.
    #[error("installation check failed: {0}")]
    Predicate(#[source] BoxError),

    /// Elevation was required for a privileged write and could not be
    /// obtained.
    #[error(transparent)]
    Elevation(#[from] ElevationError),

    /// Elevation was required for a privileged write and the process has
    /// been relaunched elevated. The run must stop.
    #[error("the process was relaunched elevated")]
    Relaunched,
}

impl StepError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                "Run the installer with administrator rights or choose a writable location"
            }
            Self::Io(_) => "Check that the target location exists and has free space",
            Self::MissingSource { .. } => "Make sure the source file exists before copying it",
            Self::ReaderFactory { .. } => "Check the source the file contents are read from",
            Self::KeyOpen { source, .. }
            | Self::KeyCreate { source, .. }
            | Self::Registry { source, .. } => match source {
                RegistryError::AccessDenied { .. } => {
                    "Run the installer with administrator rights or request fewer key rights"
                }
                RegistryError::UnexpectedType { .. } => {
                    "Remove the conflicting registry value or reinstall with force"
                }
                RegistryError::Unsupported => "Registry steps can only run on Windows",
                _ => "Check the registry path and access mask",
            },
            Self::Shortcut { .. } => {
                "Check that the shortcut folder exists and PowerShell is available"
            }
            Self::ProgramNotFound { .. } => "Install the program or add its folder to PATH",
            Self::Spawn { .. } => "Check that the program is executable",
            Self::CommandFailed { .. } => "See the command output above for details",
            Self::Predicate(_) => "Check the custom installation check",
            Self::Elevation(_) => {
                "Accept the elevation prompt or run the installer as administrator"
            }
            Self::Relaunched => "Exit this process; the elevated copy continues the installation",
        }
    }
}

/// Errors that stop an installation run.
///
/// # Example
///
/// ```rust
/// use winstall::{InstallError, StepError, StepKind};
/// use std::path::PathBuf;
///
/// let error = InstallError::Step {
///     index: 1,
///     kind: StepKind::Copy,
///     source: StepError::MissingSource { path: PathBuf::from("setup.dat") },
/// };
/// assert_eq!(error.step_kind(), Some(StepKind::Copy));
/// assert!(error.fix_suggestion().contains("source file"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The whole-run installation check failed.
    #[error("failed to check if installed: {0}")]
    GlobalCheck(#[source] BoxError),

    /// A step's idempotency check failed.
    #[error("failed to check if {kind} step {index} is installed: {source}")]
    Check {
        /// Position of the step in registration order.
        index: usize,
        kind: StepKind,
        #[source]
        source: StepError,
    },

    /// A step failed to install. Earlier steps stay installed.
    #[error("failed to install {kind} step {index}: {source}")]
    Step {
        /// Position of the step in registration order.
        index: usize,
        kind: StepKind,
        #[source]
        source: StepError,
    },

    /// Elevation was required and could not be obtained.
    #[error("failed to elevate: {0}")]
    Elevation(#[from] ElevationError),
}

impl InstallError {
    /// The kind of the failing step, if a step failed.
    pub fn step_kind(&self) -> Option<StepKind> {
        match self {
            Self::Check { kind, .. } | Self::Step { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::GlobalCheck(_) => "Check the custom installation check",
            Self::Check { source, .. } | Self::Step { source, .. } => source.fix_suggestion(),
            Self::Elevation(_) => {
                "Accept the elevation prompt or run the installer as administrator"
            }
        }
    }
}
