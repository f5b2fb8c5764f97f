//! The installation engine.
//!
//! This module provides [`Installer`], which owns an ordered list of
//! [`Step`]s and drives the installation protocol over them:
//!
//! 1. Ask the whole-run check whether the installation is complete. If it
//!    is and `FORCE_INSTALL` is unset, stop without side effects.
//! 2. If `NEEDS_ADMINISTRATOR` is set and the process is not elevated,
//!    relaunch it elevated and stop.
//! 3. For each step in registration order, skip it if it reports itself
//!    installed, otherwise install it. The first failure stops the run.
//! 4. Run the completion callback.
//!
//! Nothing is rolled back on failure. Steps are individually idempotent, so
//! re-running a partially completed installation is safe.

use super::{
    BoxError, CommandStep, CopyStep, DirectoryStep, FileStep, InstallContext, InstallError,
    InstallProgress, IoFileStep, RegistryKeyStep, ShortcutStep, Step, StepError,
};
use crate::privilege::{Elevation, ElevationOutcome, Privilege};
use crate::system::{Hive, Platform};
use crate::{InstallerFlags, InstallerOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Caller-supplied check deciding whether the whole installation is
/// complete.
pub type InstallCheck = Box<dyn Fn(&InstallContext<'_>) -> Result<bool, BoxError>>;

/// How a successful [`Installer::install`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The whole-run check reported the installation complete. Nothing ran.
    AlreadyInstalled,
    /// An elevated copy of this process was launched and will perform the
    /// installation. The caller should exit successfully.
    Relaunched,
    /// Every step is now installed.
    Installed {
        /// Steps that ran.
        installed: usize,
        /// Steps that were already installed.
        skipped: usize,
    },
}

/// An ordered, declarative installation.
///
/// Steps are appended during registration and never reordered or removed.
/// [`install`](Self::install) only reads the installer, so the same
/// instance can be run again; a second run finds every step installed.
///
/// # Example
///
/// ```rust,no_run
/// use winstall::{Installer, InstallerFlags, InstallOutcome};
/// use winstall::system::{access, Hive, RegValue};
///
/// let mut installer = Installer::new(r"C:\Program Files\Acme")
///     .with_flags(InstallerFlags::NEEDS_ADMINISTRATOR)
///     .on_finish(|| println!("done"));
///
/// installer
///     .install_directory("logs")
///     .install_file("config.ini", "conf", "[x]\n");
/// installer
///     .install_registry_key(Hive::LocalMachine, r"Software\Acme", access::KEY_ALL_ACCESS)
///     .add_value("Ver", RegValue::Dword(42));
///
/// match installer.install() {
///     Ok(InstallOutcome::Relaunched) => std::process::exit(0),
///     Ok(outcome) => println!("{outcome:?}"),
///     Err(e) => {
///         eprintln!("{e}");
///         eprintln!("{}", e.fix_suggestion());
///     }
/// }
/// ```
pub struct Installer {
    root: PathBuf,
    flags: InstallerFlags,
    steps: Vec<Step>,
    platform: Platform,
    elevation: Elevation,
    is_installed: Option<InstallCheck>,
    on_finish: Option<Box<dyn Fn()>>,
    on_progress: Option<Box<dyn Fn(&InstallProgress)>>,
}

impl Installer {
    /// Create an installer rooted at `root`, running against the native
    /// platform with no flags set.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            flags: InstallerFlags::empty(),
            steps: Vec::new(),
            platform: Platform::native(),
            elevation: Elevation::native(),
            is_installed: None,
            on_finish: None,
            on_progress: None,
        }
    }

    pub fn with_options(options: InstallerOptions) -> Self {
        Self::new(options.root).with_flags(options.flags)
    }

    pub fn with_flags(mut self, flags: InstallerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Run steps against `platform` instead of the native collaborators.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Probe and obtain elevation through `privilege`.
    pub fn with_privilege(mut self, privilege: impl Privilege + 'static) -> Self {
        self.elevation = Elevation::new(privilege);
        self
    }

    /// Replace the whole-run check. The default reports "not installed".
    pub fn is_installed_with<F>(mut self, check: F) -> Self
    where
        F: Fn(&InstallContext<'_>) -> Result<bool, BoxError> + 'static,
    {
        self.is_installed = Some(Box::new(check));
        self
    }

    /// Called once after every step has been installed or skipped.
    pub fn on_finish<F>(mut self, on_finish: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_finish = Some(Box::new(on_finish));
        self
    }

    /// Receive [`InstallProgress`] events during [`install`](Self::install).
    pub fn on_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(&InstallProgress) + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn flags(&self) -> InstallerFlags {
        self.flags
    }

    /// Registered steps, in run order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Resolve `segments` under the root. See [`make_path`](super::make_path).
    pub fn make_path<I, S>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        super::make_path(&self.root, segments)
    }

    /// Append steps in order.
    pub fn new_installation<I>(&mut self, steps: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Step>,
    {
        self.steps.extend(steps.into_iter().map(Into::into));
        self
    }

    /// Place `data` at `root/path/name`.
    pub fn install_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        data: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.new_installation([FileStep::new(name, path, data)])
    }

    /// Place the output of `reader` at `root/path/name`. The factory runs
    /// only if the file has to be written.
    pub fn install_file_reader<F>(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        reader: F,
    ) -> &mut Self
    where
        F: Fn(&Path, &str) -> io::Result<Box<dyn Read>> + 'static,
    {
        self.new_installation([IoFileStep::new(name, path, reader)])
    }

    pub fn install_directory(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.new_installation([DirectoryStep::new(path)])
    }

    pub fn install_copied_file(
        &mut self,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> &mut Self {
        self.new_installation([CopyStep::new(from, to)])
    }

    pub fn install_shortcut(
        &mut self,
        target: impl Into<PathBuf>,
        link: impl Into<PathBuf>,
    ) -> &mut Self {
        self.new_installation([ShortcutStep::new(target, link)])
    }

    /// Register a registry key and return it so values can be appended.
    pub fn install_registry_key(
        &mut self,
        hive: Hive,
        path: impl Into<String>,
        access: u32,
    ) -> &mut RegistryKeyStep {
        self.steps
            .push(Step::RegistryKey(RegistryKeyStep::new(hive, path, access)));
        match self.steps.last_mut() {
            Some(Step::RegistryKey(step)) => step,
            _ => unreachable!("a registry key step was just pushed"),
        }
    }

    /// Register a command and return it for further configuration.
    pub fn install_command<I, S>(&mut self, program: impl Into<String>, args: I) -> &mut CommandStep
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = CommandStep::new(program);
        command.args(args);
        self.steps.push(Step::Command(command));
        match self.steps.last_mut() {
            Some(Step::Command(step)) => step,
            _ => unreachable!("a command step was just pushed"),
        }
    }

    fn context(&self) -> InstallContext<'_> {
        InstallContext::new(&self.root, self.flags, &self.platform, &self.elevation)
    }

    fn report(&self, progress: InstallProgress) {
        if let Some(on_progress) = &self.on_progress {
            on_progress(&progress);
        }
    }

    /// Run the installation.
    ///
    /// # Errors
    ///
    /// Returns the first failure, annotated with the failing step. Steps
    /// before it stay installed.
    pub fn install(&self) -> Result<InstallOutcome, InstallError> {
        let ctx = self.context();

        if let Some(check) = &self.is_installed {
            let installed = check(&ctx).map_err(InstallError::GlobalCheck)?;
            if installed && !self.flags.force_install() {
                info!(root = %self.root.display(), "already installed");
                return Ok(InstallOutcome::AlreadyInstalled);
            }
        }

        info!(
            root = %self.root.display(),
            flags = ?self.flags,
            steps = self.steps.len(),
            "starting installation"
        );
        self.report(InstallProgress::Started {
            steps: self.steps.len(),
        });

        if self.flags.needs_administrator() && !self.elevation.is_elevated() {
            self.report(InstallProgress::Elevating);
            if self.elevation.make()? == ElevationOutcome::RelaunchInitiated {
                return Ok(InstallOutcome::Relaunched);
            }
        }

        let mut installed = 0;
        let mut skipped = 0;
        for (index, step) in self.steps.iter().enumerate() {
            let kind = step.kind();
            self.report(InstallProgress::Checking { index, kind });
            let present = step
                .is_installed(&ctx)
                .map_err(|source| InstallError::Check {
                    index,
                    kind,
                    source,
                })?;

            if present {
                debug!(index, %kind, "step already installed");
                self.report(InstallProgress::Skipped { index, kind });
                skipped += 1;
                continue;
            }

            debug!(index, %kind, "installing step");
            self.report(InstallProgress::Installing { index, kind });
            match step.install(&ctx) {
                Ok(()) => installed += 1,
                Err(StepError::Relaunched) => {
                    info!(index, %kind, "relaunched elevated mid-run");
                    return Ok(InstallOutcome::Relaunched);
                }
                Err(source) => {
                    return Err(InstallError::Step {
                        index,
                        kind,
                        source,
                    })
                }
            }
        }

        if let Some(on_finish) = &self.on_finish {
            on_finish();
        }
        self.report(InstallProgress::Completed);
        info!(installed, skipped, "installation complete");
        Ok(InstallOutcome::Installed { installed, skipped })
    }
}

impl Default for Installer {
    fn default() -> Self {
        Self::with_options(InstallerOptions::default())
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("root", &self.root)
            .field("flags", &self.flags)
            .field("steps", &self.steps)
            .field("elevation", &self.elevation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{access, MemoryRegistry, RegValue};
    use crate::StepKind;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[test]
    fn test_registration_preserves_order() {
        let mut installer = Installer::new("root");
        installer
            .install_directory("a")
            .install_file("b.txt", "a", "b")
            .install_copied_file("x", "y");
        installer.install_command("setup", ["/S"]);
        installer.install_shortcut("app.exe", "app.lnk");

        let kinds: Vec<StepKind> = installer.steps().iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Directory,
                StepKind::File,
                StepKind::Copy,
                StepKind::Command,
                StepKind::Shortcut
            ]
        );
    }

    #[test]
    fn test_registry_handle_appends_to_registered_step() {
        let mut installer = Installer::new("root");
        installer
            .install_registry_key(Hive::CurrentUser, r"Software\Acme", access::KEY_ALL_ACCESS)
            .add_value("Ver", RegValue::Dword(1))
            .add_value("Name", RegValue::String("acme".into()));

        match &installer.steps()[0] {
            Step::RegistryKey(step) => assert_eq!(step.values.len(), 2),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_with_options() {
        let installer = Installer::with_options(InstallerOptions {
            root: "C:/Acme".into(),
            flags: InstallerFlags::FORCE_INSTALL,
        });
        assert_eq!(installer.root(), Path::new("C:/Acme"));
        assert!(installer.flags().force_install());
    }

    #[test]
    fn test_make_path_uses_root() {
        let installer = Installer::new("root");
        assert_eq!(
            installer.make_path(["conf/../data", "x.bin"]),
            Path::new("root").join("data").join("x.bin")
        );
    }

    #[test]
    fn test_empty_installer_completes() {
        let finished = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&finished);
        let installer = Installer::new("unused").on_finish(move || *flag.borrow_mut() = true);

        assert_eq!(
            installer.install().unwrap(),
            InstallOutcome::Installed {
                installed: 0,
                skipped: 0
            }
        );
        assert!(*finished.borrow());
    }

    #[test]
    fn test_second_run_skips_everything() {
        let temp = TempDir::new().unwrap();
        let registry = MemoryRegistry::new();
        let mut installer = Installer::new(temp.path())
            .with_platform(Platform::native().with_registry(registry.clone()));
        installer
            .install_directory("logs")
            .install_file("config.ini", "", "[x]\n");
        installer
            .install_registry_key(Hive::CurrentUser, r"Software\Acme", access::KEY_ALL_ACCESS)
            .add_value("Ver", RegValue::Dword(42));

        assert_eq!(
            installer.install().unwrap(),
            InstallOutcome::Installed {
                installed: 3,
                skipped: 0
            }
        );
        assert_eq!(
            installer.install().unwrap(),
            InstallOutcome::Installed {
                installed: 0,
                skipped: 3
            }
        );
        assert_eq!(registry.writes(), 1);
    }
}
