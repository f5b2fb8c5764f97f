//! File, streamed file, directory and copy steps.
//!
//! File writes go through the guarded write primitive of the
//! [`Filesystem`](crate::system::Filesystem): the parent chain is created,
//! an existing target is kept unless `FORCE_INSTALL` is set, and when
//! `NEEDS_ADMINISTRATOR` is set elevation is re-verified right before the
//! write.

use super::{InstallContext, StepError};
use crate::system::{WriteOptions, WriteOutcome};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces the contents of a streamed file.
///
/// Called with the resolved destination path and the file name.
pub type ReaderFactory = Box<dyn Fn(&Path, &str) -> io::Result<Box<dyn Read>>>;

/// A file with literal contents, placed at `root/path/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStep {
    pub name: String,
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl FileStep {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            data: data.into(),
        }
    }

    pub fn destination(&self, ctx: &InstallContext<'_>) -> PathBuf {
        ctx.make_path([self.path.as_path(), Path::new(&self.name)])
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        Ok(ctx.filesystem().exists(&self.destination(ctx))?)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        ctx.require_elevation()?;
        let destination = self.destination(ctx);
        let mut data = self.data.as_slice();
        guarded_write(ctx, &destination, &mut data)
    }
}

/// A file whose contents are produced lazily by a [`ReaderFactory`].
pub struct IoFileStep {
    pub name: String,
    pub path: PathBuf,
    pub reader: ReaderFactory,
}

impl IoFileStep {
    pub fn new<F>(name: impl Into<String>, path: impl Into<PathBuf>, reader: F) -> Self
    where
        F: Fn(&Path, &str) -> io::Result<Box<dyn Read>> + 'static,
    {
        Self {
            name: name.into(),
            path: path.into(),
            reader: Box::new(reader),
        }
    }

    pub fn destination(&self, ctx: &InstallContext<'_>) -> PathBuf {
        ctx.make_path([self.path.as_path(), Path::new(&self.name)])
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        Ok(ctx.filesystem().exists(&self.destination(ctx))?)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        ctx.require_elevation()?;
        let destination = self.destination(ctx);
        let mut reader =
            (self.reader)(&destination, &self.name).map_err(|source| StepError::ReaderFactory {
                path: destination.clone(),
                source,
            })?;
        guarded_write(ctx, &destination, reader.as_mut())
    }
}

impl std::fmt::Debug for IoFileStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoFileStep")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A directory at `root/path`, created with any missing parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStep {
    pub path: PathBuf,
}

impl DirectoryStep {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        Ok(ctx.filesystem().exists(&ctx.make_path([&self.path]))?)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        let path = ctx.make_path([&self.path]);
        debug!(path = %path.display(), "creating directory");
        ctx.filesystem().create_dir_all(&path)?;
        Ok(())
    }
}

/// A byte-for-byte copy of `from` to `to`.
///
/// Both paths are used as given, not resolved under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyStep {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl CopyStep {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        Ok(ctx.filesystem().exists(&self.to)?)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        let filesystem = ctx.filesystem();
        if !filesystem.exists(&self.from)? {
            return Err(StepError::MissingSource {
                path: self.from.clone(),
            });
        }
        let copied = filesystem.copy(&self.from, &self.to)?;
        debug!(from = %self.from.display(), to = %self.to.display(), bytes = copied, "copied file");
        Ok(())
    }
}

fn guarded_write(
    ctx: &InstallContext<'_>,
    path: &Path,
    contents: &mut dyn Read,
) -> Result<(), StepError> {
    let options = WriteOptions {
        force_overwrite: ctx.flags().force_install(),
        create_parent: true,
    };
    match ctx.filesystem().write(path, options, contents)? {
        WriteOutcome::Written(bytes) => debug!(path = %path.display(), bytes, "wrote file"),
        WriteOutcome::Kept => debug!(path = %path.display(), "kept existing file"),
    }
    Ok(())
}
