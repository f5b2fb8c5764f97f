//! Privilege elevation.
//!
//! The [`Privilege`] trait is the operating-system boundary: it probes
//! whether the process is elevated and relaunches an executable elevated.
//! [`Elevation`] layers the handshake on top: it caches a confirmed
//! elevated state for the rest of the run and relaunches the current
//! process, with its working directory and arguments, when elevation is
//! missing.
//!
//! A successful relaunch does not terminate anything here. It is reported
//! as [`ElevationOutcome::RelaunchInitiated`], and the caller is expected to
//! exit so the elevated copy can run the installation from the top.

mod native;

pub use native::NativePrivilege;

use std::cell::Cell;
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from probing or obtaining elevation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ElevationError {
    /// The elevated relaunch could not be started (declined prompt,
    /// missing executable, shell failure).
    #[error("failed to relaunch {} elevated: {message}", executable.display())]
    Relaunch {
        /// The executable that was to be relaunched.
        executable: PathBuf,
        /// What the operating system reported.
        message: String,
    },

    /// The current executable or working directory could not be determined.
    #[error("failed to determine the current process: {0}")]
    CurrentProcess(#[source] io::Error),

    /// Elevated relaunch is not available on this platform.
    #[error("privilege elevation is not supported on this platform")]
    Unsupported,
}

/// Operating-system privilege primitives.
pub trait Privilege {
    /// Probe whether the current process holds elevated rights.
    fn is_elevated(&self) -> bool;

    /// Start `executable` elevated in `working_dir` with `args`.
    ///
    /// Arguments are passed as the OS gave them, including ones that are
    /// not valid Unicode. Returns once the elevated process has been
    /// launched. The current process keeps running.
    fn relaunch_elevated(
        &self,
        executable: &Path,
        working_dir: &Path,
        args: &[OsString],
    ) -> Result<(), ElevationError>;
}

/// Result of [`Elevation::make`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationOutcome {
    /// The process is elevated; carry on.
    AlreadyElevated,
    /// An elevated copy of this process was launched. The caller must stop
    /// and exit successfully.
    RelaunchInitiated,
}

/// Elevation state for one process, plus the relaunch handshake.
///
/// The elevated flag starts false and is only ever set after a probe
/// confirms elevation. It is never set speculatively before a relaunch.
pub struct Elevation {
    privilege: Box<dyn Privilege>,
    elevated: Cell<bool>,
}

impl Elevation {
    pub fn new(privilege: impl Privilege + 'static) -> Self {
        Self {
            privilege: Box::new(privilege),
            elevated: Cell::new(false),
        }
    }

    /// Elevation backed by [`NativePrivilege`].
    pub fn native() -> Self {
        Self::new(NativePrivilege)
    }

    /// Whether the process is elevated, probing only until the first
    /// positive answer.
    pub fn is_elevated(&self) -> bool {
        if self.elevated.get() {
            return true;
        }
        let elevated = self.privilege.is_elevated();
        if elevated {
            self.elevated.set(true);
        }
        elevated
    }

    /// Make sure the process is elevated.
    ///
    /// A no-op when elevation is already cached. Otherwise the state is
    /// probed directly, since it may have changed outside this process, and
    /// if still unelevated the current executable is relaunched elevated
    /// with the same working directory and arguments.
    pub fn make(&self) -> Result<ElevationOutcome, ElevationError> {
        if self.elevated.get() {
            return Ok(ElevationOutcome::AlreadyElevated);
        }
        if self.privilege.is_elevated() {
            debug!("process is already elevated");
            self.elevated.set(true);
            return Ok(ElevationOutcome::AlreadyElevated);
        }

        let executable = env::current_exe().map_err(ElevationError::CurrentProcess)?;
        let working_dir = env::current_dir().map_err(ElevationError::CurrentProcess)?;
        let args: Vec<OsString> = env::args_os().skip(1).collect();

        info!(
            executable = %executable.display(),
            working_dir = %working_dir.display(),
            "relaunching elevated"
        );
        if let Err(e) = self
            .privilege
            .relaunch_elevated(&executable, &working_dir, &args)
        {
            warn!(error = %e, "elevation failed, continuing unelevated");
            return Err(e);
        }
        Ok(ElevationOutcome::RelaunchInitiated)
    }
}

impl Default for Elevation {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for Elevation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Elevation")
            .field("elevated", &self.elevated.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakePrivilege {
        elevated: Rc<Cell<bool>>,
        refuse: bool,
        probes: Rc<Cell<usize>>,
        relaunches: Rc<Cell<usize>>,
        relaunch_args: Rc<RefCell<Vec<OsString>>>,
    }

    impl Privilege for FakePrivilege {
        fn is_elevated(&self) -> bool {
            self.probes.set(self.probes.get() + 1);
            self.elevated.get()
        }

        fn relaunch_elevated(
            &self,
            executable: &Path,
            _working_dir: &Path,
            args: &[OsString],
        ) -> Result<(), ElevationError> {
            self.relaunches.set(self.relaunches.get() + 1);
            *self.relaunch_args.borrow_mut() = args.to_vec();
            if self.refuse {
                return Err(ElevationError::Relaunch {
                    executable: executable.to_path_buf(),
                    message: "The operation was canceled by the user.".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_make_when_elevated_is_noop() {
        let fake = FakePrivilege::default();
        fake.elevated.set(true);
        let elevation = Elevation::new(fake.clone());

        assert_eq!(elevation.make().unwrap(), ElevationOutcome::AlreadyElevated);
        assert_eq!(elevation.make().unwrap(), ElevationOutcome::AlreadyElevated);
        assert_eq!(fake.relaunches.get(), 0);
        // The second call answers from the cache.
        assert_eq!(fake.probes.get(), 1);
    }

    #[test]
    fn test_make_relaunches_when_unelevated() {
        let fake = FakePrivilege::default();
        let elevation = Elevation::new(fake.clone());

        assert_eq!(
            elevation.make().unwrap(),
            ElevationOutcome::RelaunchInitiated
        );
        assert_eq!(fake.relaunches.get(), 1);
        assert!(!elevation.is_elevated());
    }

    #[test]
    fn test_relaunch_forwards_raw_arguments() {
        let fake = FakePrivilege::default();
        Elevation::new(fake.clone()).make().unwrap();

        let expected: Vec<OsString> = env::args_os().skip(1).collect();
        assert_eq!(*fake.relaunch_args.borrow(), expected);
    }

    #[test]
    fn test_make_surfaces_refusal() {
        let fake = FakePrivilege {
            refuse: true,
            ..Default::default()
        };
        let elevation = Elevation::new(fake.clone());

        let err = elevation.make().unwrap_err();
        assert!(matches!(err, ElevationError::Relaunch { .. }));
        assert!(err.to_string().contains("canceled by the user"));
    }

    #[test]
    fn test_state_change_out_of_band_is_seen() {
        let fake = FakePrivilege::default();
        let elevation = Elevation::new(fake.clone());
        assert!(!elevation.is_elevated());

        fake.elevated.set(true);
        assert_eq!(elevation.make().unwrap(), ElevationOutcome::AlreadyElevated);
        assert_eq!(fake.relaunches.get(), 0);
        assert!(elevation.is_elevated());
    }

    #[test]
    fn test_is_elevated_caches_only_positive() {
        let fake = FakePrivilege::default();
        let elevation = Elevation::new(fake.clone());

        assert!(!elevation.is_elevated());
        assert!(!elevation.is_elevated());
        assert_eq!(fake.probes.get(), 2);

        fake.elevated.set(true);
        assert!(elevation.is_elevated());
        assert!(elevation.is_elevated());
        assert_eq!(fake.probes.get(), 3);
    }
}
