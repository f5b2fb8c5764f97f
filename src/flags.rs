//! Installer flags shared by the engine and every step.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Independent facets that modify how an installation run behaves.
    ///
    /// The set is open: facets are plain bits, so steps and the engine test
    /// them independently and new facets can be added without touching
    /// existing callers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use winstall::InstallerFlags;
    ///
    /// let flags = InstallerFlags::NEEDS_ADMINISTRATOR | InstallerFlags::FORCE_INSTALL;
    /// assert!(flags.needs_administrator());
    /// assert!(flags.force_install());
    /// assert!(!InstallerFlags::default().force_install());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct InstallerFlags: u32 {
        /// The run writes to protected locations and must hold elevation.
        const NEEDS_ADMINISTRATOR = 1 << 0;
        /// Run even when the installation reports itself complete, and
        /// overwrite existing files and registry values while doing so.
        const FORCE_INSTALL = 1 << 1;
    }
}

impl InstallerFlags {
    /// Whether the run requires an elevated process.
    pub fn needs_administrator(&self) -> bool {
        self.contains(Self::NEEDS_ADMINISTRATOR)
    }

    /// Whether the run was asked to reinstall over existing state.
    pub fn force_install(&self) -> bool {
        self.contains(Self::FORCE_INSTALL)
    }
}
