//! Installation steps and the engine that runs them.
//!
//! Build an [`Installer`], register steps on it, then call
//! [`Installer::install`]. Each step is one variant of the closed [`Step`]
//! enum and knows how to check whether it is already installed and how to
//! install itself against an [`InstallContext`].
//!
//! # Example
//!
//! ```rust
//! use winstall::{Installer, InstallOutcome};
//!
//! let root = tempfile::tempdir().unwrap();
//! let mut installer = Installer::new(root.path());
//! installer.install_file("config.ini", "conf", "[x]\n");
//!
//! assert_eq!(
//!     installer.install().unwrap(),
//!     InstallOutcome::Installed { installed: 1, skipped: 0 }
//! );
//! assert_eq!(
//!     installer.install().unwrap(),
//!     InstallOutcome::Installed { installed: 0, skipped: 1 }
//! );
//! ```

mod command;
mod context;
mod errors;
mod files;
mod installer;
mod progress;
mod regkey;
mod shortcut;
mod step;

pub use command::{CommandPredicate, CommandStep, OutputMode};
pub use context::{make_path, InstallContext};
pub use errors::{BoxError, InstallError, StepError};
pub use files::{CopyStep, DirectoryStep, FileStep, IoFileStep, ReaderFactory};
pub use installer::{InstallCheck, InstallOutcome, Installer};
pub use progress::InstallProgress;
pub use regkey::{RegistryKeyStep, RegistryValue};
pub use shortcut::ShortcutStep;
pub use step::{Step, StepKind};
