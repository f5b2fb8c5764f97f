//! Shell integration: shortcut (`.lnk`) creation.

use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Creates shell shortcuts.
pub trait Shell {
    /// Create a shortcut at `link` pointing at `target`.
    fn create_shortcut(&self, target: &Path, link: &Path) -> io::Result<()>;
}

/// [`Shell`] that drives the `WScript.Shell` COM object through PowerShell.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellShell;

impl Shell for PowerShellShell {
    fn create_shortcut(&self, target: &Path, link: &Path) -> io::Result<()> {
        let script = shortcut_script(target, link);
        debug!(target = %target.display(), link = %link.display(), "creating shortcut");

        let output = Command::new("powershell")
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                &script,
            ])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "powershell exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// PowerShell one-liner that saves a shortcut, with both paths quoted.
fn shortcut_script(target: &Path, link: &Path) -> String {
    format!(
        "$s = (New-Object -ComObject WScript.Shell).CreateShortcut({}); \
         $s.TargetPath = {}; $s.Save()",
        ps_quote(link),
        ps_quote(target)
    )
}

fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}
