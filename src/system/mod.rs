//! Collaborators the installation steps act through.
//!
//! Steps never touch the operating system directly. File, directory and copy
//! steps go through a [`Filesystem`], registry steps through a [`Registry`]
//! and shortcut steps through a [`Shell`]. A [`Platform`] bundles one of
//! each; [`Platform::native`] wires up the real implementations and tests
//! swap in recording or in-memory ones.

mod fs;
mod native_registry;
mod registry;
mod shell;

pub use fs::{Filesystem, OsFilesystem, WriteOptions, WriteOutcome};
pub use native_registry::NativeRegistry;
pub use registry::{
    access, Hive, KeyDisposition, MemoryRegistry, RegValue, Registry, RegistryError, RegistryKey,
    ValueKind,
};
pub use shell::{PowerShellShell, Shell};

/// The set of collaborators an [`Installer`](crate::Installer) runs against.
///
/// # Example
///
/// ```rust
/// use winstall::system::{MemoryRegistry, Platform};
///
/// // Native filesystem and shell, in-memory registry.
/// let platform = Platform::native().with_registry(MemoryRegistry::new());
/// ```
pub struct Platform {
    filesystem: Box<dyn Filesystem>,
    registry: Box<dyn Registry>,
    shell: Box<dyn Shell>,
}

impl Platform {
    /// The operating system's own filesystem, registry and shell.
    pub fn native() -> Self {
        Self {
            filesystem: Box::new(OsFilesystem),
            registry: Box::new(NativeRegistry),
            shell: Box::new(PowerShellShell),
        }
    }

    pub fn with_filesystem(mut self, filesystem: impl Filesystem + 'static) -> Self {
        self.filesystem = Box::new(filesystem);
        self
    }

    pub fn with_registry(mut self, registry: impl Registry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn with_shell(mut self, shell: impl Shell + 'static) -> Self {
        self.shell = Box::new(shell);
        self
    }

    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    pub fn shell(&self) -> &dyn Shell {
        self.shell.as_ref()
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
