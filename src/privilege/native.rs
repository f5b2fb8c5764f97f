//! Operating-system privilege checks and the `runas` relaunch.

use super::{ElevationError, Privilege};
use std::ffi::OsString;
use std::path::Path;

/// [`Privilege`] for the running platform.
///
/// On Windows elevation is read from the process token and relaunch goes
/// through `ShellExecuteW` with the `runas` verb, which shows the UAC prompt.
/// Other platforms report unelevated and refuse to relaunch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePrivilege;

impl Privilege for NativePrivilege {
    fn is_elevated(&self) -> bool {
        #[cfg(windows)]
        {
            windows_admin::token_is_elevated()
        }
        #[cfg(not(windows))]
        {
            false
        }
    }

    fn relaunch_elevated(
        &self,
        executable: &Path,
        working_dir: &Path,
        args: &[OsString],
    ) -> Result<(), ElevationError> {
        #[cfg(windows)]
        {
            use std::os::windows::ffi::OsStrExt;

            let args: Vec<Vec<u16>> = args
                .iter()
                .map(|arg| arg.encode_wide().collect())
                .collect();
            windows_admin::shell_execute_runas(executable, working_dir, &command_line(&args))
        }
        #[cfg(not(windows))]
        {
            let _ = (executable, working_dir, args);
            Err(ElevationError::Unsupported)
        }
    }
}

#[cfg(any(windows, test))]
const BACKSLASH: u16 = b'\\' as u16;
#[cfg(any(windows, test))]
const QUOTE: u16 = b'"' as u16;
#[cfg(any(windows, test))]
const SPACE: u16 = b' ' as u16;
#[cfg(any(windows, test))]
const TAB: u16 = b'\t' as u16;

/// Join UTF-16 arguments into one Windows command line, quoting where
/// needed. Unpaired surrogates pass through untouched.
#[cfg(any(windows, test))]
fn command_line(args: &[Vec<u16>]) -> Vec<u16> {
    let mut line = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(SPACE);
        }
        quote_arg(arg, &mut line);
    }
    line
}

#[cfg(any(windows, test))]
fn quote_arg(arg: &[u16], out: &mut Vec<u16>) {
    if !arg.is_empty() && !arg.iter().any(|&c| matches!(c, SPACE | TAB | QUOTE)) {
        out.extend_from_slice(arg);
        return;
    }

    out.push(QUOTE);
    let mut backslashes = 0;
    for &c in arg {
        match c {
            BACKSLASH => backslashes += 1,
            QUOTE => {
                out.extend(std::iter::repeat(BACKSLASH).take(backslashes * 2 + 1));
                out.push(QUOTE);
                backslashes = 0;
            }
            _ => {
                out.extend(std::iter::repeat(BACKSLASH).take(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }
    // Backslashes before the closing quote must be doubled.
    out.extend(std::iter::repeat(BACKSLASH).take(backslashes * 2));
    out.push(QUOTE);
}

#[cfg(windows)]
mod windows_admin {
    use super::ElevationError;
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    pub(super) fn token_is_elevated() -> bool {
        unsafe {
            let mut token = HANDLE::default();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
                return false;
            }

            let mut elevation = TOKEN_ELEVATION::default();
            let mut return_length = 0u32;
            let result = GetTokenInformation(
                token,
                TokenElevation,
                Some(&mut elevation as *mut _ as *mut _),
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut return_length,
            );

            let _ = CloseHandle(token);
            result.is_ok() && elevation.TokenIsElevated != 0
        }
    }

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    pub(super) fn shell_execute_runas(
        executable: &Path,
        working_dir: &Path,
        parameters: &[u16],
    ) -> Result<(), ElevationError> {
        let verb = wide(OsStr::new("runas"));
        let file = wide(executable.as_os_str());
        let params: Vec<u16> = parameters.iter().copied().chain(std::iter::once(0)).collect();
        let dir = wide(working_dir.as_os_str());

        let result = unsafe {
            ShellExecuteW(
                None,
                PCWSTR(verb.as_ptr()),
                PCWSTR(file.as_ptr()),
                PCWSTR(params.as_ptr()),
                PCWSTR(dir.as_ptr()),
                SW_SHOWNORMAL,
            )
        };
        // Values up to 32 are error codes.
        let code = result.0 as isize;
        if code <= 32 {
            return Err(ElevationError::Relaunch {
                executable: executable.to_path_buf(),
                message: format!("ShellExecuteW returned {code}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(args: &[&str]) -> String {
        let args: Vec<Vec<u16>> = args.iter().map(|a| a.encode_utf16().collect()).collect();
        String::from_utf16_lossy(&command_line(&args))
    }

    #[test]
    fn test_plain_args_are_untouched() {
        assert_eq!(line(&["--silent", "C:\\App"]), "--silent C:\\App");
    }

    #[test]
    fn test_args_with_spaces_are_quoted() {
        assert_eq!(line(&["C:\\Program Files\\App"]), "\"C:\\Program Files\\App\"");
        assert_eq!(line(&["", "x"]), "\"\" x");
    }

    #[test]
    fn test_embedded_quotes_are_escaped() {
        assert_eq!(line(&["say \"hi\""]), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_trailing_backslashes_doubled_inside_quotes() {
        assert_eq!(line(&["C:\\My Dir\\"]), "\"C:\\My Dir\\\\\"");
    }

    #[test]
    fn test_unpaired_surrogate_survives_quoting() {
        let arg = vec![u16::from(b'a'), 0xD800, SPACE, u16::from(b'b')];
        let quoted = command_line(&[arg.clone()]);
        assert_eq!(quoted.first(), Some(&QUOTE));
        assert_eq!(quoted.last(), Some(&QUOTE));
        assert_eq!(&quoted[1..quoted.len() - 1], arg.as_slice());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unsupported_off_windows() {
        assert!(!NativePrivilege.is_elevated());
        let err = NativePrivilege
            .relaunch_elevated(Path::new("/bin/true"), Path::new("/"), &[])
            .unwrap_err();
        assert!(matches!(err, ElevationError::Unsupported));
    }
}
