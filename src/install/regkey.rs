//! Registry key step.
//!
//! A key is installed when it exists and every declared value can be read
//! back with the accessor of its kind. Only presence is checked, so a value
//! whose data changed out of band still counts as installed.

use super::{InstallContext, StepError};
use crate::system::{Hive, KeyDisposition, RegValue, ValueKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A named value declared on a [`RegistryKeyStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryValue {
    pub name: String,
    pub value: RegValue,
}

/// A registry key under `hive`, plus the values to write into it.
///
/// Values are written in declaration order, and only when the key is newly
/// created or `FORCE_INSTALL` is set. An existing key is otherwise left
/// exactly as found, even if some declared values are missing from it.
///
/// # Example
///
/// ```rust
/// use winstall::install::RegistryKeyStep;
/// use winstall::system::{access, Hive, RegValue};
///
/// let mut step =
///     RegistryKeyStep::new(Hive::CurrentUser, r"Software\Acme\App", access::KEY_ALL_ACCESS);
/// step.add_value("Ver", RegValue::Dword(42))
///     .add_value("InstallDir", RegValue::String(r"C:\Acme".into()));
/// assert_eq!(step.values.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryKeyStep {
    pub hive: Hive,
    pub path: String,
    /// Access mask used both to open the key for checking and to create it.
    pub access: u32,
    pub values: Vec<RegistryValue>,
}

impl RegistryKeyStep {
    pub fn new(hive: Hive, path: impl Into<String>, access: u32) -> Self {
        Self {
            hive,
            path: path.into(),
            access,
            values: Vec::new(),
        }
    }

    /// Append a value to write. Names are not deduplicated.
    pub fn add_value(&mut self, name: impl Into<String>, value: RegValue) -> &mut Self {
        self.values.push(RegistryValue {
            name: name.into(),
            value,
        });
        self
    }

    fn display_path(&self) -> String {
        format!("{}\\{}", self.hive, self.path)
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        let key = match ctx.registry().open_key(self.hive, &self.path, self.access) {
            Ok(key) => key,
            Err(e) if e.is_absent() => return Ok(false),
            Err(source) => {
                return Err(StepError::KeyOpen {
                    path: self.display_path(),
                    source,
                })
            }
        };

        for declared in &self.values {
            let kind = declared.value.kind();
            if kind == ValueKind::None {
                continue;
            }
            match key.get_value(&declared.name, kind) {
                Ok(_) => {}
                Err(e) if e.is_absent() => {
                    debug!(
                        key = %self.display_path(),
                        value = %declared.name,
                        "registry value missing"
                    );
                    return Ok(false);
                }
                Err(source) => {
                    return Err(StepError::Registry {
                        value: declared.name.clone(),
                        source,
                    })
                }
            }
        }
        Ok(true)
    }

    pub(crate) fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        let (key, disposition) = ctx
            .registry()
            .create_key(self.hive, &self.path, self.access)
            .map_err(|source| StepError::KeyCreate {
                path: self.display_path(),
                source,
            })?;

        if disposition == KeyDisposition::OpenedExisting && !ctx.flags().force_install() {
            debug!(key = %self.display_path(), "key exists, leaving values untouched");
            return Ok(());
        }

        for declared in &self.values {
            if declared.value == RegValue::None {
                continue;
            }
            key.set_value(&declared.name, &declared.value)
                .map_err(|source| StepError::Registry {
                    value: declared.name.clone(),
                    source,
                })?;
        }
        debug!(key = %self.display_path(), values = self.values.len(), "wrote registry key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::Elevation;
    use crate::system::{
        access, KeyDisposition, MemoryRegistry, Platform, Registry, RegistryError, RegistryKey,
    };
    use crate::InstallerFlags;
    use std::path::Path;

    const PATH: &str = r"Software\Acme\App";

    fn run<R>(
        registry: &MemoryRegistry,
        flags: InstallerFlags,
        f: impl FnOnce(&InstallContext<'_>) -> R,
    ) -> R {
        let platform = Platform::native().with_registry(registry.clone());
        let elevation = Elevation::native();
        let ctx = InstallContext::new(Path::new("."), flags, &platform, &elevation);
        f(&ctx)
    }

    /// Refuses every key, as a hive without the caller's rights would.
    struct DeniedRegistry;

    impl Registry for DeniedRegistry {
        fn open_key(
            &self,
            hive: Hive,
            path: &str,
            _access: u32,
        ) -> Result<Box<dyn RegistryKey>, RegistryError> {
            Err(RegistryError::AccessDenied {
                path: format!("{hive}\\{path}"),
            })
        }

        fn create_key(
            &self,
            _hive: Hive,
            _path: &str,
            _access: u32,
        ) -> Result<(Box<dyn RegistryKey>, KeyDisposition), RegistryError> {
            Err(RegistryError::Unsupported)
        }
    }

    fn step() -> RegistryKeyStep {
        let mut step = RegistryKeyStep::new(Hive::CurrentUser, PATH, access::KEY_ALL_ACCESS);
        step.add_value("Ver", RegValue::Dword(42))
            .add_value("Path", RegValue::ExpandString(r"%ProgramFiles%\Acme".into()));
        step
    }

    #[test]
    fn test_new_key_writes_all_values() {
        let registry = MemoryRegistry::new();
        let step = step();

        run(&registry, InstallerFlags::empty(), |ctx| {
            assert!(!step.is_installed(ctx).unwrap());
            step.install(ctx).unwrap();
            assert!(step.is_installed(ctx).unwrap());
        });

        assert_eq!(
            registry.value(Hive::CurrentUser, PATH, "Ver"),
            Some(RegValue::Dword(42))
        );
        assert_eq!(registry.writes(), 2);
    }

    #[test]
    fn test_existing_key_untouched_without_force() {
        let registry = MemoryRegistry::new();
        registry.insert_value(Hive::CurrentUser, PATH, "Ver", RegValue::Dword(1));
        let step = step();

        run(&registry, InstallerFlags::empty(), |ctx| {
            // "Path" is missing, so the key is not installed.
            assert!(!step.is_installed(ctx).unwrap());
            step.install(ctx).unwrap();
        });
        assert_eq!(registry.writes(), 0);
        assert_eq!(registry.value(Hive::CurrentUser, PATH, "Path"), None);
    }

    #[test]
    fn test_existing_key_rewritten_with_force() {
        let registry = MemoryRegistry::new();
        registry.insert_value(Hive::CurrentUser, PATH, "Ver", RegValue::Dword(1));
        let step = step();

        run(&registry, InstallerFlags::FORCE_INSTALL, |ctx| step.install(ctx)).unwrap();
        assert_eq!(
            registry.value(Hive::CurrentUser, PATH, "Ver"),
            Some(RegValue::Dword(42))
        );
        assert!(registry.value(Hive::CurrentUser, PATH, "Path").is_some());
    }

    #[test]
    fn test_changed_data_still_installed() {
        let registry = MemoryRegistry::new();
        let step = step();
        run(&registry, InstallerFlags::empty(), |ctx| step.install(ctx)).unwrap();

        registry.insert_value(Hive::CurrentUser, PATH, "Ver", RegValue::Dword(7));
        assert!(run(&registry, InstallerFlags::empty(), |ctx| step.is_installed(ctx)).unwrap());
    }

    #[test]
    fn test_integer_accessor_reads_either_width() {
        let registry = MemoryRegistry::new();
        registry.insert_value(Hive::CurrentUser, PATH, "Ver", RegValue::Qword(42));
        registry.insert_value(Hive::CurrentUser, PATH, "Path", RegValue::String("x".into()));

        assert!(run(&registry, InstallerFlags::empty(), |ctx| step().is_installed(ctx)).unwrap());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let registry = MemoryRegistry::new();
        registry.insert_value(Hive::CurrentUser, PATH, "Ver", RegValue::String("42".into()));

        let err = run(&registry, InstallerFlags::empty(), |ctx| step().is_installed(ctx))
            .unwrap_err();
        match err {
            StepError::Registry { value, source } => {
                assert_eq!(value, "Ver");
                assert!(matches!(source, RegistryError::UnexpectedType { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_none_values_are_never_written_or_checked() {
        let registry = MemoryRegistry::new();
        let mut step =
            RegistryKeyStep::new(Hive::LocalMachine, r"Software\Marker", access::KEY_ALL_ACCESS);
        step.add_value("", RegValue::None);

        run(&registry, InstallerFlags::empty(), |ctx| {
            step.install(ctx).unwrap();
            assert!(step.is_installed(ctx).unwrap());
        });
        assert!(registry.contains_key(Hive::LocalMachine, r"Software\Marker"));
        assert_eq!(registry.writes(), 0);
    }

    #[test]
    fn test_write_failure_names_value() {
        let registry = MemoryRegistry::new();
        let mut step = RegistryKeyStep::new(Hive::CurrentUser, PATH, access::KEY_READ);
        step.add_value("Ver", RegValue::Dword(42));

        let err = run(&registry, InstallerFlags::empty(), |ctx| step.install(ctx)).unwrap_err();
        assert!(matches!(err, StepError::Registry { ref value, .. } if value == "Ver"));
    }

    #[test]
    fn test_first_missing_value_stops_the_check() {
        let registry = MemoryRegistry::new();
        registry.insert_value(Hive::CurrentUser, PATH, "B", RegValue::String("x".into()));
        let mut step = RegistryKeyStep::new(Hive::CurrentUser, PATH, access::KEY_READ);
        step.add_value("A", RegValue::Dword(1))
            .add_value("B", RegValue::Dword(2));

        // "B" would fail to read as a dword, but "A" is already missing.
        let installed = run(&registry, InstallerFlags::empty(), |ctx| step.is_installed(ctx));
        assert!(!installed.unwrap());
    }

    #[test]
    fn test_open_failure_other_than_absent_is_error() {
        let platform = Platform::native().with_registry(DeniedRegistry);
        let elevation = Elevation::native();
        let ctx = InstallContext::new(
            Path::new("."),
            InstallerFlags::empty(),
            &platform,
            &elevation,
        );

        match step().is_installed(&ctx).unwrap_err() {
            StepError::KeyOpen { path, source } => {
                assert_eq!(path, r"HKEY_CURRENT_USER\Software\Acme\App");
                assert!(matches!(source, RegistryError::AccessDenied { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            step().install(&ctx).unwrap_err(),
            StepError::KeyCreate { .. }
        ));
    }
}
