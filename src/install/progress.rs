//! Progress reporting types for installation runs.
//!
//! The [`InstallProgress`] enum represents the discrete stages of a run.
//! Register a callback with [`Installer::on_progress`](crate::Installer::on_progress)
//! to receive them.

use super::StepKind;

/// Progress stages during an installation run.
///
/// Events arrive in run order: `Started`, then `Elevating` if a relaunch
/// handshake is needed, then `Checking` for each step followed by either
/// `Skipped` or `Installing`, then `Completed`. A run that fails or
/// relaunches stops emitting at the point it stopped working.
///
/// # Example
///
/// ```rust
/// use winstall::InstallProgress;
///
/// fn on_progress(progress: &InstallProgress) {
///     match progress {
///         InstallProgress::Started { steps } => println!("{steps} steps to check"),
///         InstallProgress::Installing { index, kind } => {
///             println!("step {index}: installing {kind}");
///         }
///         other => println!("{}", other.description()),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    /// The run has started.
    Started {
        /// Number of registered steps.
        steps: usize,
    },

    /// Elevation is required and is being obtained.
    Elevating,

    /// A step's idempotency check is running.
    Checking { index: usize, kind: StepKind },

    /// A step was already installed and will not run.
    Skipped { index: usize, kind: StepKind },

    /// A step is being installed.
    Installing { index: usize, kind: StepKind },

    /// Every step is installed.
    Completed,
}

impl InstallProgress {
    /// Get a human-readable description of the current progress stage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use winstall::InstallProgress;
    ///
    /// assert_eq!(InstallProgress::Elevating.description(), "Requesting administrator rights");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Starting installation",
            Self::Elevating => "Requesting administrator rights",
            Self::Checking { .. } => "Checking",
            Self::Skipped { .. } => "Already installed",
            Self::Installing { .. } => "Installing",
            Self::Completed => "Installation complete",
        }
    }

    /// Check if this progress stage indicates completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The step this event is about, if any.
    pub fn step(&self) -> Option<(usize, StepKind)> {
        match self {
            Self::Checking { index, kind }
            | Self::Skipped { index, kind }
            | Self::Installing { index, kind } => Some((*index, *kind)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_progress_description() {
        assert_eq!(
            InstallProgress::Started { steps: 3 }.description(),
            "Starting installation"
        );
        assert_eq!(
            InstallProgress::Checking {
                index: 0,
                kind: StepKind::File
            }
            .description(),
            "Checking"
        );
        assert_eq!(
            InstallProgress::Skipped {
                index: 1,
                kind: StepKind::Directory
            }
            .description(),
            "Already installed"
        );
        assert_eq!(
            InstallProgress::Installing {
                index: 2,
                kind: StepKind::RegistryKey
            }
            .description(),
            "Installing"
        );
        assert_eq!(
            InstallProgress::Completed.description(),
            "Installation complete"
        );
    }

    #[test]
    fn test_install_progress_is_complete() {
        assert!(InstallProgress::Completed.is_complete());
        assert!(!InstallProgress::Elevating.is_complete());
        assert!(!InstallProgress::Started { steps: 0 }.is_complete());
    }

    #[test]
    fn test_step_accessor() {
        let progress = InstallProgress::Installing {
            index: 4,
            kind: StepKind::Command,
        };
        assert_eq!(progress.step(), Some((4, StepKind::Command)));
        assert_eq!(InstallProgress::Completed.step(), None);
    }
}
