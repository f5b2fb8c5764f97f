//! Registry collaborator: key handles with typed value accessors.
//!
//! The installation engine never marshals registry data itself. It opens or
//! creates keys through a [`Registry`] and reads or writes [`RegValue`]s
//! through the returned [`RegistryKey`] handle. "Key absent" and "value
//! absent" are reported as distinguishable [`RegistryError`] variants so
//! idempotency checks can treat them as not-installed.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::rc::Rc;
use thiserror::Error;

/// Access rights for opening and creating keys.
///
/// These are the Windows `KEY_*` access masks; combine them with `|`.
pub mod access {
    /// Read values of a key.
    pub const KEY_QUERY_VALUE: u32 = 0x0001;
    /// Create, overwrite or delete values of a key.
    pub const KEY_SET_VALUE: u32 = 0x0002;
    /// Create subkeys.
    pub const KEY_CREATE_SUB_KEY: u32 = 0x0004;
    /// Standard read access.
    pub const KEY_READ: u32 = 0x0002_0019;
    /// Standard write access.
    pub const KEY_WRITE: u32 = 0x0002_0006;
    /// Full access.
    pub const KEY_ALL_ACCESS: u32 = 0x000F_003F;
    /// Use the 64-bit registry view from a 32-bit process.
    pub const KEY_WOW64_64KEY: u32 = 0x0100;
    /// Use the 32-bit registry view from a 64-bit process.
    pub const KEY_WOW64_32KEY: u32 = 0x0200;
}

/// Predefined root key a registry path is resolved against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Hive {
    #[strum(to_string = "HKEY_CLASSES_ROOT")]
    ClassesRoot,
    #[strum(to_string = "HKEY_CURRENT_USER")]
    CurrentUser,
    #[strum(to_string = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[strum(to_string = "HKEY_USERS")]
    Users,
    #[strum(to_string = "HKEY_CURRENT_CONFIG")]
    CurrentConfig,
}

/// Tag naming which typed accessor reads and writes a value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ValueKind {
    /// Placeholder: nothing is read or written.
    None,
    Dword,
    Qword,
    String,
    ExpandString,
    MultiString,
    Binary,
}

impl ValueKind {
    /// Whether the accessor for `self` can read a value stored as `stored`.
    ///
    /// Integer accessors read both widths and string accessors read both
    /// plain and expandable strings, like the native registry API.
    pub fn reads(&self, stored: ValueKind) -> bool {
        use ValueKind::*;
        match (self, stored) {
            (Dword | Qword, Dword | Qword) => true,
            (String | ExpandString, String | ExpandString) => true,
            (a, b) => *a == b,
        }
    }
}

/// A typed registry value.
///
/// The payload decides the [`ValueKind`], so a declared kind can never
/// disagree with the data it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegValue {
    /// Writes nothing; used for keys that only need to exist.
    None,
    Dword(u32),
    Qword(u64),
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Binary(Vec<u8>),
}

impl RegValue {
    /// The accessor tag for this payload.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Dword(_) => ValueKind::Dword,
            Self::Qword(_) => ValueKind::Qword,
            Self::String(_) => ValueKind::String,
            Self::ExpandString(_) => ValueKind::ExpandString,
            Self::MultiString(_) => ValueKind::MultiString,
            Self::Binary(_) => ValueKind::Binary,
        }
    }
}

/// Whether [`Registry::create_key`] created the key or found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    CreatedNew,
    OpenedExisting,
}

/// Errors reported by registry collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The key does not exist.
    #[error("registry key not found: {path}")]
    KeyNotFound { path: String },

    /// The value does not exist under an existing key.
    #[error("registry value not found: {name}")]
    ValueNotFound { name: String },

    /// The stored value cannot be read with the declared accessor.
    #[error("registry value {name} is stored as {found}, expected {expected}")]
    UnexpectedType {
        name: String,
        expected: ValueKind,
        found: String,
    },

    /// The key was opened without the rights the operation needs.
    #[error("access denied to registry key {path}")]
    AccessDenied { path: String },

    /// No registry exists on this platform.
    #[error("the Windows registry is not available on this platform")]
    Unsupported,

    /// Any other failure from the operating system.
    #[error("registry I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RegistryError {
    /// Whether this error means "key or value absent" rather than a failure.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::ValueNotFound { .. })
    }
}

/// An open registry key. The handle closes when dropped.
pub trait RegistryKey {
    /// Read `name` with the accessor selected by `kind`.
    fn get_value(&self, name: &str, kind: ValueKind) -> Result<RegValue, RegistryError>;

    /// Write `value` under `name` with the accessor matching its kind.
    fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryError>;
}

/// Opens and creates registry keys.
pub trait Registry {
    /// Open an existing key with the `access` mask.
    fn open_key(
        &self,
        hive: Hive,
        path: &str,
        access: u32,
    ) -> Result<Box<dyn RegistryKey>, RegistryError>;

    /// Open `path`, creating it (and missing parents) when absent.
    fn create_key(
        &self,
        hive: Hive,
        path: &str,
        access: u32,
    ) -> Result<(Box<dyn RegistryKey>, KeyDisposition), RegistryError>;
}

type KeyId = (Hive, String);
type Values = BTreeMap<String, RegValue>;

#[derive(Debug, Default)]
struct MemoryStore {
    keys: RefCell<BTreeMap<KeyId, Values>>,
    writes: Cell<usize>,
}

/// In-process [`Registry`] usable on every platform.
///
/// Key paths and value names are case-insensitive, as in the Windows
/// registry. Clones share the same store, so a caller can keep a handle for
/// inspection while the installer owns another.
///
/// # Example
///
/// ```rust
/// use winstall::system::{access, Hive, MemoryRegistry, RegValue, Registry};
///
/// let registry = MemoryRegistry::new();
/// let (key, _) = registry
///     .create_key(Hive::CurrentUser, r"Software\Demo", access::KEY_ALL_ACCESS)
///     .unwrap();
/// key.set_value("Ver", &RegValue::Dword(42)).unwrap();
///
/// assert_eq!(
///     registry.value(Hive::CurrentUser, r"software\demo", "ver"),
///     Some(RegValue::Dword(42))
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    store: Rc<MemoryStore>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values written through key handles so far.
    pub fn writes(&self) -> usize {
        self.store.writes.get()
    }

    /// Whether the key exists.
    pub fn contains_key(&self, hive: Hive, path: &str) -> bool {
        self.store.keys.borrow().contains_key(&key_id(hive, path))
    }

    /// Read a stored value directly, bypassing access checks.
    pub fn value(&self, hive: Hive, path: &str, name: &str) -> Option<RegValue> {
        self.store
            .keys
            .borrow()
            .get(&key_id(hive, path))
            .and_then(|values| values.get(&name.to_lowercase()).cloned())
    }

    /// Store a value directly, creating the key if needed.
    ///
    /// Out-of-band writes are not counted by [`writes`](Self::writes).
    pub fn insert_value(&self, hive: Hive, path: &str, name: &str, value: RegValue) {
        self.store
            .keys
            .borrow_mut()
            .entry(key_id(hive, path))
            .or_default()
            .insert(name.to_lowercase(), value);
    }

    /// Create an empty key directly.
    pub fn insert_key(&self, hive: Hive, path: &str) {
        self.store
            .keys
            .borrow_mut()
            .entry(key_id(hive, path))
            .or_default();
    }

    fn handle(&self, hive: Hive, path: &str, access: u32) -> Box<dyn RegistryKey> {
        Box::new(MemoryKey {
            store: Rc::clone(&self.store),
            id: key_id(hive, path),
            display: format!("{hive}\\{path}"),
            access,
        })
    }
}

impl Registry for MemoryRegistry {
    fn open_key(
        &self,
        hive: Hive,
        path: &str,
        access: u32,
    ) -> Result<Box<dyn RegistryKey>, RegistryError> {
        if !self.contains_key(hive, path) {
            return Err(RegistryError::KeyNotFound {
                path: format!("{hive}\\{path}"),
            });
        }
        Ok(self.handle(hive, path, access))
    }

    fn create_key(
        &self,
        hive: Hive,
        path: &str,
        access: u32,
    ) -> Result<(Box<dyn RegistryKey>, KeyDisposition), RegistryError> {
        let disposition = if self.contains_key(hive, path) {
            KeyDisposition::OpenedExisting
        } else {
            for parent in ancestors(path) {
                self.insert_key(hive, parent);
            }
            self.insert_key(hive, path);
            KeyDisposition::CreatedNew
        };
        Ok((self.handle(hive, path, access), disposition))
    }
}

struct MemoryKey {
    store: Rc<MemoryStore>,
    id: KeyId,
    display: String,
    access: u32,
}

impl MemoryKey {
    fn require(&self, right: u32) -> Result<(), RegistryError> {
        if self.access & right == right {
            Ok(())
        } else {
            Err(RegistryError::AccessDenied {
                path: self.display.clone(),
            })
        }
    }
}

impl RegistryKey for MemoryKey {
    fn get_value(&self, name: &str, kind: ValueKind) -> Result<RegValue, RegistryError> {
        self.require(access::KEY_QUERY_VALUE)?;
        let keys = self.store.keys.borrow();
        let stored = keys
            .get(&self.id)
            .ok_or_else(|| RegistryError::KeyNotFound {
                path: self.display.clone(),
            })?
            .get(&name.to_lowercase())
            .ok_or_else(|| RegistryError::ValueNotFound {
                name: name.to_string(),
            })?;

        if !kind.reads(stored.kind()) {
            return Err(RegistryError::UnexpectedType {
                name: name.to_string(),
                expected: kind,
                found: stored.kind().to_string(),
            });
        }
        Ok(stored.clone())
    }

    fn set_value(&self, name: &str, value: &RegValue) -> Result<(), RegistryError> {
        self.require(access::KEY_SET_VALUE)?;
        self.store
            .keys
            .borrow_mut()
            .entry(self.id.clone())
            .or_default()
            .insert(name.to_lowercase(), value.clone());
        self.store.writes.set(self.store.writes.get() + 1);
        Ok(())
    }
}

fn key_id(hive: Hive, path: &str) -> KeyId {
    (hive, path.trim_matches('\\').to_lowercase())
}

/// Proper ancestors of `path`, outermost first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let path = path.trim_matches('\\');
    path.match_indices('\\').map(move |(end, _)| &path[..end])
}
