//! # winstall
//!
//! Declarative, idempotent installation steps for Windows programs.
//!
//! An [`Installer`] owns an ordered list of steps (files, directories,
//! copies, shortcuts, registry keys and commands) rooted at an installation
//! directory. Every step can tell whether it is already installed, so a run
//! only does the work that is missing and running it twice is harmless.
//!
//! ## Features
//!
//! - [`InstallerFlags`] to force a reinstall or require administrator rights
//! - [`Installer`] builder with per-step registration and a whole-run check
//! - Privilege elevation that relaunches the current process through UAC
//! - [`InstallProgress`] events and actionable [`InstallError`]s
//! - Swappable [`system`] collaborators, including an in-memory registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use winstall::{Installer, InstallerFlags, InstallOutcome};
//! use winstall::system::{access, Hive, RegValue};
//!
//! let mut installer = Installer::new(r"C:\Program Files\Acme")
//!     .with_flags(InstallerFlags::NEEDS_ADMINISTRATOR)
//!     .on_progress(|p| println!("{}", p.description()));
//!
//! installer
//!     .install_file("acme.exe", "bin", std::fs::read("dist/acme.exe").unwrap_or_default())
//!     .install_shortcut(
//!         r"C:\Program Files\Acme\bin\acme.exe",
//!         r"C:\Users\Public\Desktop\Acme.lnk",
//!     );
//! installer
//!     .install_registry_key(Hive::LocalMachine, r"Software\Acme", access::KEY_ALL_ACCESS)
//!     .add_value("InstallDir", RegValue::String(r"C:\Program Files\Acme".into()));
//!
//! match installer.install() {
//!     Ok(InstallOutcome::Relaunched) => std::process::exit(0),
//!     Ok(_) => println!("installed"),
//!     Err(e) => eprintln!("{e}\n{}", e.fix_suggestion()),
//! }
//! ```

mod flags;
pub mod install;
mod options;
pub mod privilege;
pub mod system;

pub use flags::InstallerFlags;
pub use install::{
    InstallContext, InstallError, InstallOutcome, InstallProgress, Installer, Step, StepError,
    StepKind,
};
pub use options::InstallerOptions;
pub use privilege::{Elevation, ElevationError, ElevationOutcome, Privilege};
