//! Shell shortcut step.

use super::{InstallContext, StepError};
use std::path::PathBuf;
use tracing::debug;

/// A shell shortcut at `link` pointing at `target`.
///
/// Only the presence of `link` is checked; an existing shortcut is never
/// compared against `target`. Both paths are used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutStep {
    pub target: PathBuf,
    pub link: PathBuf,
}

impl ShortcutStep {
    pub fn new(target: impl Into<PathBuf>, link: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            link: link.into(),
        }
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        Ok(ctx.filesystem().exists(&self.link)?)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        debug!(target = %self.target.display(), link = %self.link.display(), "creating shortcut");
        ctx.shell()
            .create_shortcut(&self.target, &self.link)
            .map_err(|source| StepError::Shortcut {
                link: self.link.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::Elevation;
    use crate::system::{Platform, Shell};
    use crate::InstallerFlags;
    use std::cell::RefCell;
    use std::io;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingShell {
        calls: Rc<RefCell<Vec<(PathBuf, PathBuf)>>>,
        fail: bool,
    }

    impl Shell for RecordingShell {
        fn create_shortcut(&self, target: &Path, link: &Path) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::other("COM not registered"));
            }
            self.calls
                .borrow_mut()
                .push((target.to_path_buf(), link.to_path_buf()));
            std::fs::write(link, b"lnk")
        }
    }

    #[test]
    fn test_shortcut_presence_is_idempotency() {
        let temp = TempDir::new().unwrap();
        let shell = RecordingShell::default();
        let platform = Platform::native().with_shell(shell.clone());
        let elevation = Elevation::native();
        let ctx = InstallContext::new(temp.path(), InstallerFlags::empty(), &platform, &elevation);

        let step = ShortcutStep::new("C:/App/app.exe", temp.path().join("App.lnk"));
        assert!(!step.is_installed(&ctx).unwrap());
        step.install(&ctx).unwrap();
        assert!(step.is_installed(&ctx).unwrap());

        let calls = shell.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("C:/App/app.exe"));
    }

    #[test]
    fn test_shell_failure_names_link() {
        let temp = TempDir::new().unwrap();
        let shell = RecordingShell {
            fail: true,
            ..Default::default()
        };
        let platform = Platform::native().with_shell(shell);
        let elevation = Elevation::native();
        let ctx = InstallContext::new(temp.path(), InstallerFlags::empty(), &platform, &elevation);

        let step = ShortcutStep::new("app.exe", temp.path().join("App.lnk"));
        let err = step.install(&ctx).unwrap_err();
        assert!(matches!(err, StepError::Shortcut { .. }));
        assert!(err.to_string().contains("App.lnk"));
    }
}
