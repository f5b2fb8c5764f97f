//! The read-only view of an installer that steps run against.

use super::StepError;
use crate::privilege::{Elevation, ElevationOutcome};
use crate::system::{Filesystem, Platform, Registry, Shell};
use crate::InstallerFlags;
use std::path::{Component, Path, PathBuf};

/// Everything a step may consult while checking or installing itself.
///
/// Borrowed from the [`Installer`](crate::Installer) for the duration of one
/// run, so steps can read the root, the flags and the collaborators but
/// cannot register or remove steps.
#[derive(Debug, Clone, Copy)]
pub struct InstallContext<'a> {
    root: &'a Path,
    flags: InstallerFlags,
    platform: &'a Platform,
    elevation: &'a Elevation,
}

impl<'a> InstallContext<'a> {
    pub fn new(
        root: &'a Path,
        flags: InstallerFlags,
        platform: &'a Platform,
        elevation: &'a Elevation,
    ) -> Self {
        Self {
            root,
            flags,
            platform,
            elevation,
        }
    }

    pub fn root(&self) -> &'a Path {
        self.root
    }

    pub fn flags(&self) -> InstallerFlags {
        self.flags
    }

    pub fn filesystem(&self) -> &'a dyn Filesystem {
        self.platform.filesystem()
    }

    pub fn registry(&self) -> &'a dyn Registry {
        self.platform.registry()
    }

    pub fn shell(&self) -> &'a dyn Shell {
        self.platform.shell()
    }

    pub fn elevation(&self) -> &'a Elevation {
        self.elevation
    }

    /// Resolve `segments` under the root. See [`make_path`].
    pub fn make_path<I, S>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        make_path(self.root, segments)
    }

    /// Make sure the process is elevated before a privileged write.
    ///
    /// Does nothing unless `NEEDS_ADMINISTRATOR` is set. A relaunch means
    /// this process must stop, which is reported as
    /// [`StepError::Relaunched`].
    pub(crate) fn require_elevation(&self) -> Result<(), StepError> {
        if !self.flags.needs_administrator() {
            return Ok(());
        }
        match self.elevation.make()? {
            ElevationOutcome::AlreadyElevated => Ok(()),
            ElevationOutcome::RelaunchInitiated => Err(StepError::Relaunched),
        }
    }
}

/// Join `segments` onto `root`, normalizing each segment on its own.
///
/// Inside a segment `.` is dropped, `name/..` collapses and repeated
/// separators disappear. Root and drive prefixes are stripped, so an
/// absolute segment is still placed under `root`. A `..` that a segment
/// cannot collapse is kept. Empty segments contribute nothing.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use winstall::install::make_path;
///
/// let path = make_path(Path::new("app"), ["conf/./x/../", "/settings.ini"]);
/// assert_eq!(path, PathBuf::from("app").join("conf").join("settings.ini"));
/// ```
pub fn make_path<I, S>(root: &Path, segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<Path>,
{
    let mut path = root.to_path_buf();
    for segment in segments {
        let segment = normalize_segment(segment.as_ref());
        if !segment.as_os_str().is_empty() {
            path.push(segment);
        }
    }
    path
}

fn normalize_segment(segment: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in segment.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }
    parts.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_path_joins_in_order() {
        let path = make_path(Path::new("root"), ["a", "b", "c.txt"]);
        assert_eq!(path, Path::new("root").join("a").join("b").join("c.txt"));
    }

    #[test]
    fn test_make_path_normalizes_each_segment() {
        let path = make_path(Path::new("root"), ["a/./b//", "x/../y"]);
        assert_eq!(path, Path::new("root").join("a").join("b").join("y"));
    }

    #[test]
    fn test_make_path_absolute_segment_stays_under_root() {
        let path = make_path(Path::new("root"), ["/etc", "passwd"]);
        assert_eq!(path, Path::new("root").join("etc").join("passwd"));
    }

    #[test]
    fn test_make_path_keeps_leading_parent() {
        let path = make_path(Path::new("root"), ["../shared"]);
        assert_eq!(path, Path::new("root").join("..").join("shared"));
    }

    #[test]
    fn test_make_path_skips_empty_segments() {
        let path = make_path(Path::new("root"), ["", ".", "file"]);
        assert_eq!(path, Path::new("root").join("file"));
    }

    #[test]
    fn test_make_path_no_segments_is_root() {
        let segments: [&str; 0] = [];
        assert_eq!(make_path(Path::new("root"), segments), PathBuf::from("root"));
    }
}
