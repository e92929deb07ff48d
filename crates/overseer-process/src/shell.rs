//! Interactive-shell command assembly.
//!
//! The supervisor's shell-command variant wraps a single command string in
//! the platform's interactive shell. The assembly here is pure string work
//! and is exposed unconditionally; the launcher picks the platform-correct
//! variant at its call site.

/// Interactive shell used on Unix-family platforms.
pub const UNIX_SHELL: &str = "/bin/bash";

/// Interactive shell used on the Windows family.
pub const WINDOWS_SHELL: &str = "cmd";

/// Known interactive-shell executables, matched against the final path
/// component with any `.exe` suffix stripped.
const INTERACTIVE_SHELLS: &[&str] = &["cmd", "powershell", "pwsh", "sh", "bash", "zsh"];

/// Program and argument vector for running `command` under `/bin/bash -c`.
///
/// The command string reaches bash verbatim as the single `-c` operand, so
/// no additional quote escaping is applied here.
pub fn bash_invocation(command: &str) -> (&'static str, [String; 2]) {
    (UNIX_SHELL, ["-c".to_string(), command.to_string()])
}

/// Raw argument tail for running `command` under `cmd /c`.
///
/// Embedded double quotes are doubled, which is how `cmd` expects them
/// inside a quoted command. The result must be passed as a raw argument so
/// the quoting survives untouched.
pub fn cmd_invocation_tail(command: &str) -> String {
    format!("/c \"{}\"", command.replace('"', "\"\""))
}

/// Check whether an executable path names a known interactive shell.
///
/// Splits on both separator conventions so a Windows-style path is still
/// recognized when assembled on another platform.
pub fn is_interactive_shell(file_path: &str) -> bool {
    let name = file_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_path)
        .to_lowercase();
    let name = name.strip_suffix(".exe").unwrap_or(&name);
    INTERACTIVE_SHELLS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_invocation_passes_command_verbatim() {
        let (program, args) = bash_invocation(r#"echo "hello world""#);
        assert_eq!(program, "/bin/bash");
        assert_eq!(args[0], "-c");
        assert_eq!(args[1], r#"echo "hello world""#);
    }

    #[test]
    fn test_cmd_invocation_doubles_embedded_quotes() {
        let tail = cmd_invocation_tail(r#"echo "hi""#);
        assert_eq!(tail, r#"/c "echo ""hi""""#);
    }

    #[test]
    fn test_cmd_invocation_plain_command() {
        assert_eq!(cmd_invocation_tail("dir"), r#"/c "dir""#);
    }

    #[test]
    fn test_interactive_shell_detection() {
        assert!(is_interactive_shell("/bin/bash"));
        assert!(is_interactive_shell("/bin/sh"));
        assert!(is_interactive_shell("cmd"));
        assert!(is_interactive_shell(r"C:\Windows\System32\cmd.exe"));
        assert!(is_interactive_shell("PowerShell.EXE"));
        assert!(!is_interactive_shell("/usr/local/bin/myservice"));
        assert!(!is_interactive_shell("bashful"));
    }
}
