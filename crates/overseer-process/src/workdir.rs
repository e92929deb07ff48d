//! Working-directory derivation for launched executables.
//!
//! When the caller supplies no working directory, the launcher derives one
//! from the executable path itself: everything up to the final separator
//! segment. Known interactive shells and directory-relative invocations are
//! exempt and fall through to the OS default directory.

use crate::shell::is_interactive_shell;
use std::path::{Path, PathBuf};

/// Derive a working directory from an executable path.
///
/// Returns `None` (leave the OS default) when the path names a known
/// interactive shell, is not absolute, or has no parent component.
pub fn derive_working_directory(file_path: &str) -> Option<PathBuf> {
    if is_interactive_shell(file_path) {
        return None;
    }

    let path = Path::new(file_path);
    if !path.is_absolute() {
        return None;
    }

    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        return None;
    }

    Some(parent.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_derives_parent_for_absolute_path() {
        assert_eq!(
            derive_working_directory("/usr/local/bin/myservice"),
            Some(PathBuf::from("/usr/local/bin"))
        );
    }

    #[test]
    fn test_bare_program_name_yields_none() {
        assert_eq!(derive_working_directory("myservice"), None);
    }

    #[test]
    fn test_relative_invocation_yields_none() {
        assert_eq!(derive_working_directory("./myservice"), None);
        assert_eq!(derive_working_directory("bin/myservice"), None);
    }

    #[test]
    fn test_interactive_shell_yields_none() {
        assert_eq!(derive_working_directory("/bin/bash"), None);
        assert_eq!(derive_working_directory("/bin/sh"), None);
    }

    #[test]
    #[cfg(windows)]
    fn test_derives_parent_for_windows_path() {
        assert_eq!(
            derive_working_directory(r"C:\Services\myservice.exe"),
            Some(PathBuf::from(r"C:\Services"))
        );
        assert_eq!(derive_working_directory(r"C:\Windows\System32\cmd.exe"), None);
    }
}
