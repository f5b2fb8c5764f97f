//! The closed set of installation steps.

use super::{
    CommandStep, CopyStep, DirectoryStep, FileStep, InstallContext, IoFileStep, RegistryKeyStep,
    ShortcutStep, StepError,
};
use serde::{Deserialize, Serialize};

/// One idempotent unit of installation work.
///
/// Every variant answers two questions: [`is_installed`](Self::is_installed),
/// a pure read where "target absent" means `Ok(false)`, and
/// [`install`](Self::install), which performs the side effect.
#[derive(Debug)]
pub enum Step {
    File(FileStep),
    IoFile(IoFileStep),
    Directory(DirectoryStep),
    Copy(CopyStep),
    Shortcut(ShortcutStep),
    Command(CommandStep),
    RegistryKey(RegistryKeyStep),
}

/// Fieldless tag for each [`Step`] variant, used in errors and progress
/// events.
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
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    File,
    IoFile,
    Directory,
    Copy,
    Shortcut,
    Command,
    RegistryKey,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::File(_) => StepKind::File,
            Self::IoFile(_) => StepKind::IoFile,
            Self::Directory(_) => StepKind::Directory,
            Self::Copy(_) => StepKind::Copy,
            Self::Shortcut(_) => StepKind::Shortcut,
            Self::Command(_) => StepKind::Command,
            Self::RegistryKey(_) => StepKind::RegistryKey,
        }
    }

    /// Whether the step's effect is already present.
    pub fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        match self {
            Self::File(step) => step.is_installed(ctx),
            Self::IoFile(step) => step.is_installed(ctx),
            Self::Directory(step) => step.is_installed(ctx),
            Self::Copy(step) => step.is_installed(ctx),
            Self::Shortcut(step) => step.is_installed(ctx),
            Self::Command(step) => step.is_installed(ctx),
            Self::RegistryKey(step) => step.is_installed(ctx),
        }
    }

    /// Perform the step's side effect.
    pub fn install(&self, ctx: &InstallContext<'_>) -> Result<(), StepError> {
        match self {
            Self::File(step) => step.install(ctx),
            Self::IoFile(step) => step.install(ctx),
            Self::Directory(step) => step.install(ctx),
            Self::Copy(step) => step.install(ctx),
            Self::Shortcut(step) => step.install(ctx),
            Self::Command(step) => step.install(ctx),
            Self::RegistryKey(step) => step.install(ctx),
        }
    }
}

macro_rules! impl_from_step {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Step {
                fn from(step: $ty) -> Self {
                    Self::$variant(step)
                }
            }
        )*
    };
}

impl_from_step!(
    File(FileStep),
    IoFile(IoFileStep),
    Directory(DirectoryStep),
    Copy(CopyStep),
    Shortcut(ShortcutStep),
    Command(CommandStep),
    RegistryKey(RegistryKeyStep),
);
