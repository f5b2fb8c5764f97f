//! The operating system registry.
//!
//! On Windows this wraps `winreg`; elsewhere every call fails with
//! [`RegistryError::Unsupported`].

/// [`Registry`](super::Registry) backed by the Windows registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRegistry;

#[cfg(not(windows))]
mod unsupported {
    use super::NativeRegistry;
    use crate::system::registry::{Hive, KeyDisposition, Registry, RegistryError, RegistryKey};

    impl Registry for NativeRegistry {
        fn open_key(
            &self,
            _hive: Hive,
            _path: &str,
            _access: u32,
        ) -> Result<Box<dyn RegistryKey>, RegistryError> {
            Err(RegistryError::Unsupported)
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
}

#[cfg(windows)]
mod windows_registry {
    use super::NativeRegistry;
    use crate::system::registry::{
        Hive, KeyDisposition, RegValue, Registry, RegistryError, RegistryKey, ValueKind,
    };
    use std::io;
    use winreg::enums::*;
    use winreg::types::{FromRegValue, ToRegValue};
    use winreg::{RegKey, RegValue as RawValue};

    fn predef(hive: Hive) -> RegKey {
        RegKey::predef(match hive {
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }

    fn key_error(hive: Hive, path: &str, e: io::Error) -> RegistryError {
        let path = format!("{hive}\\{path}");
        match e.kind() {
            io::ErrorKind::NotFound => RegistryError::KeyNotFound { path },
            io::ErrorKind::PermissionDenied => RegistryError::AccessDenied { path },
            _ => RegistryError::Io(e),
        }
    }

    impl Registry for NativeRegistry {
        fn open_key(
            &self,
            hive: Hive,
            path: &str,
            access: u32,
        ) -> Result<Box<dyn RegistryKey>, RegistryError> {
            let key = predef(hive)
                .open_subkey_with_flags(path, access)
                .map_err(|e| key_error(hive, path, e))?;
            Ok(Box::new(NativeKey {
                key,
                display: format!("{hive}\\{path}"),
            }))
        }

        fn create_key(
            &self,
            hive: Hive,
            path: &str,
            access: u32,
        ) -> Result<(Box<dyn RegistryKey>, KeyDisposition), RegistryError> {
            let (key, disposition) = predef(hive)
                .create_subkey_with_flags(path, access)
                .map_err(|e| key_error(hive, path, e))?;
            let disposition = match disposition {
                REG_CREATED_NEW_KEY => KeyDisposition::CreatedNew,
                REG_OPENED_EXISTING_KEY => KeyDisposition::OpenedExisting,
            };
            let handle = NativeKey {
                key,
                display: format!("{hive}\\{path}"),
            };
            Ok((Box::new(handle), disposition))
        }
    }

    struct NativeKey {
        key: RegKey,
        display: String,
    }

    impl NativeKey {
        fn value_error(&self, name: &str, e: io::Error) -> RegistryError {
            match e.kind() {
                io::ErrorKind::NotFound => RegistryError::ValueNotFound {
                    name: name.to_string(),
                },
                io::ErrorKind::PermissionDenied => RegistryError::AccessDenied {
                    path: self.display.clone(),
                },
                _ => RegistryError::Io(e),
            }
        }
    }

    fn stored_kind(vtype: &RegType) -> Option<ValueKind> {
        Some(match vtype {
            REG_DWORD => ValueKind::Dword,
            REG_QWORD => ValueKind::Qword,
            REG_SZ => ValueKind::String,
            REG_EXPAND_SZ => ValueKind::ExpandString,
            REG_MULTI_SZ => ValueKind::MultiString,
            REG_BINARY => ValueKind::Binary,
            _ => return None,
        })
    }

    impl RegistryKey for NativeKey {
        fn get_value(&self, name: &str, kind: ValueKind) -> Result<RegValue, RegistryError> {
            let raw = self
                .key
                .get_raw_value(name)
                .map_err(|e| self.value_error(name, e))?;
            let stored = stored_kind(&raw.vtype).filter(|stored| kind.reads(*stored));
            let Some(stored) = stored else {
                return Err(RegistryError::UnexpectedType {
                    name: name.to_string(),
                    expected: kind,
                    found: format!("{:?}", raw.vtype),
                });
            };

            let value = match stored {
                ValueKind::None => RegValue::None,
                ValueKind::Dword => RegValue::Dword(u32::from_reg_value(&raw)?),
                ValueKind::Qword => RegValue::Qword(u64::from_reg_value(&raw)?),
                ValueKind::String => RegValue::String(String::from_reg_value(&raw)?),
                ValueKind::ExpandString => RegValue::ExpandString(String::from_reg_value(&raw)?),
                ValueKind::MultiString => {
                    RegValue::MultiString(Vec::<String>::from_reg_value(&raw)?)
                }
                ValueKind::Binary => RegValue::Binary(raw.bytes),
            };
            Ok(value)
        }

        fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryError> {
            let result = match value {
                RegValue::None => return Ok(()),
                RegValue::Dword(n) => self.key.set_value(name, n),
                RegValue::Qword(n) => self.key.set_value(name, n),
                RegValue::String(s) => self.key.set_value(name, s),
                RegValue::MultiString(items) => self.key.set_value(name, items),
                RegValue::ExpandString(s) => {
                    let raw = RawValue {
                        vtype: REG_EXPAND_SZ,
                        ..s.to_reg_value()
                    };
                    self.key.set_raw_value(name, &raw)
                }
                RegValue::Binary(bytes) => self.key.set_raw_value(
                    name,
                    &RawValue {
                        bytes: bytes.clone(),
                        vtype: REG_BINARY,
                    },
                ),
            };
            result.map_err(|e| self.value_error(name, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_unsupported_off_windows() {
        use crate::system::{Hive, Registry, RegistryError};

        let err = NativeRegistry
            .open_key(Hive::CurrentUser, "Software", 0)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::Unsupported));
        assert!(!err.is_absent());

        let err = NativeRegistry
            .create_key(Hive::CurrentUser, "Software", 0)
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::Unsupported));
    }

    #[cfg(windows)]
    #[test]
    fn test_values_round_trip_through_winreg() {
        use crate::system::{access, Hive, RegValue, Registry, ValueKind};

        let path = format!(r"Software\winstall-test-{}", std::process::id());
        let (key, _) = NativeRegistry
            .create_key(Hive::CurrentUser, &path, access::KEY_ALL_ACCESS)
            .unwrap();

        let values = [
            ("Ver", RegValue::Dword(42)),
            ("Big", RegValue::Qword(1 << 40)),
            ("Name", RegValue::String("acme".into())),
            ("Dir", RegValue::ExpandString(r"%ProgramFiles%\Acme".into())),
            ("List", RegValue::MultiString(vec!["a".into(), "bc".into()])),
            ("Blob", RegValue::Binary(vec![1, 2, 3])),
        ];
        for (name, value) in &values {
            key.set_value(name, value).unwrap();
            assert_eq!(&key.get_value(name, value.kind()).unwrap(), value);
        }
        assert!(key
            .get_value("Missing", ValueKind::Dword)
            .unwrap_err()
            .is_absent());

        // Strings written by other tools may carry an odd byte count.
        let hkcu = winreg::RegKey::predef(winreg::enums::HKEY_CURRENT_USER);
        let raw = hkcu.open_subkey_with_flags(&path, access::KEY_ALL_ACCESS).unwrap();
        let odd = winreg::RegValue {
            bytes: vec![b'a', 0, b'b', 0, 0],
            vtype: winreg::enums::REG_SZ,
        };
        raw.set_raw_value("Odd", &odd).unwrap();
        assert_eq!(
            key.get_value("Odd", ValueKind::String).unwrap(),
            RegValue::String("ab".into())
        );

        let _ = hkcu.delete_subkey_all(&path);
    }
}
