//! External command step.
//!
//! A command has no observable installed state of its own, so it runs on
//! every installation unless the caller supplies a predicate that says
//! otherwise.

use super::{BoxError, InstallContext, StepError};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Caller-supplied check deciding whether a command step already ran.
pub type CommandPredicate = Box<dyn Fn(&InstallContext<'_>) -> Result<bool, BoxError>>;

/// Where a command's output stream goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Share the installer's own stream.
    #[default]
    Inherit,
    /// Discard the output.
    Null,
    /// Append the output to a file, creating it when missing.
    File(PathBuf),
}

impl OutputMode {
    fn stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
            Self::File(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?
                .into(),
        })
    }
}

/// Run `program` with `args` to completion.
///
/// The program is resolved through `PATH` before spawning. A non-zero exit
/// fails the step.
///
/// # Example
///
/// ```rust
/// use winstall::install::{CommandStep, OutputMode};
///
/// let mut step = CommandStep::new("msiexec");
/// step.args(["/i", "runtime.msi", "/quiet"])
///     .stdout(OutputMode::Null)
///     .is_installed_with(|ctx| Ok(ctx.root().join("runtime").exists()));
/// assert_eq!(step.args.len(), 3);
/// ```
pub struct CommandStep {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdout: OutputMode,
    pub stderr: OutputMode,
    /// Process creation flags passed to `CreateProcess`. Ignored off
    /// Windows.
    pub creation_flags: u32,
    predicate: Option<CommandPredicate>,
}

impl CommandStep {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdout: OutputMode::default(),
            stderr: OutputMode::default(),
            creation_flags: 0,
            predicate: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdout(&mut self, mode: OutputMode) -> &mut Self {
        self.stdout = mode;
        self
    }

    pub fn stderr(&mut self, mode: OutputMode) -> &mut Self {
        self.stderr = mode;
        self
    }

    pub fn creation_flags(&mut self, flags: u32) -> &mut Self {
        self.creation_flags = flags;
        self
    }

    /// Replace the default "never installed" check.
    pub fn is_installed_with<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&InstallContext<'_>) -> Result<bool, BoxError> + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub(crate) fn is_installed(&self, ctx: &InstallContext<'_>) -> Result<bool, StepError> {
        match &self.predicate {
            Some(predicate) => predicate(ctx).map_err(StepError::Predicate),
            None => Ok(false),
        }
    }

    pub(crate) fn install(&self, _ctx: &InstallContext<'_>) -> Result<(), StepError> {
        let program = which::which(&self.program).map_err(|source| StepError::ProgramNotFound {
            program: self.program.clone(),
            source,
        })?;

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(self.stdout.stdio()?)
            .stderr(self.stderr.stdio()?);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(self.creation_flags);
        }

        debug!(program = %program.display(), args = ?self.args, "running command");
        let status = command.status().map_err(|source| StepError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(StepError::CommandFailed {
                program,
                exit_code: status.code(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandStep")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .field("creation_flags", &self.creation_flags)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}
