//! Filesystem primitives consumed by file, directory and copy steps.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// How a guarded write treats the target and its parent directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overwrite the target when it already exists.
    pub force_overwrite: bool,
    /// Create the parent directory chain before writing.
    pub create_parent: bool,
}

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The target was created or truncated and this many bytes written.
    Written(u64),
    /// The target already existed and was left untouched.
    Kept,
}

/// Filesystem operations used by the installation steps.
///
/// Every method reports "not there" through its return value rather than an
/// error where that is a normal state, so steps can treat absence as
/// not-installed.
pub trait Filesystem {
    /// Whether `path` exists. Only unexpected I/O failures are errors.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Recursively create `path`, tolerating an existing directory.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write `contents` to `path` according to `options`.
    fn write(
        &self,
        path: &Path,
        options: WriteOptions,
        contents: &mut dyn Read,
    ) -> io::Result<WriteOutcome>;

    /// Stream-copy `from` into `to`, returning the number of bytes copied.
    ///
    /// The parent of `to` must already exist.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir_all(path) {
            Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e),
            _ => Ok(()),
        }
    }

    fn write(
        &self,
        path: &Path,
        options: WriteOptions,
        contents: &mut dyn Read,
    ) -> io::Result<WriteOutcome> {
        if options.create_parent {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.create_dir_all(parent)?;
            }
        }

        if self.exists(path)? && !options.force_overwrite {
            return Ok(WriteOutcome::Kept);
        }

        let mut file = fs::File::create(path)?;
        let written = io::copy(contents, &mut file)?;
        file.flush()?;
        Ok(WriteOutcome::Written(written))
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let mut source = fs::File::open(from)?;
        let mut destination = fs::File::create(to)?;
        let copied = io::copy(&mut source, &mut destination)?;
        destination.flush()?;
        Ok(copied)
    }
}
