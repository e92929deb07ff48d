//! Process termination primitives.
//!
//! This module provides cross-platform process termination: a cooperative
//! request first (SIGTERM on Unix, a console Ctrl+Break on Windows), and an
//! unconditional kill for processes that ignore it.

use overseer_common::ProcessResult;

/// Request cooperative termination (SIGTERM on Unix, Ctrl+Break on Windows).
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let nix_pid = Pid::from_raw(pid as i32);
        kill(nix_pid, Signal::SIGTERM)
            .map_err(|e| overseer_common::ProcessError::stop_failed(pid.to_string(), e.to_string()))
    }

    #[cfg(windows)]
    {
        use std::time::Duration;

        crate::terminate_windows::send_termination_signal(
            pid,
            false, // Process is alive
            Duration::from_secs(5),
        )
        .map_err(|e| overseer_common::ProcessError::stop_failed(pid.to_string(), e))
    }
}

/// Force kill a process (SIGKILL on Unix, TerminateProcess on Windows).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let nix_pid = Pid::from_raw(pid as i32);
        kill(nix_pid, Signal::SIGKILL)
            .map_err(|e| overseer_common::ProcessError::kill_failed(pid.to_string(), e.to_string()))
    }

    #[cfg(windows)]
    {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
                Ok(h) if !h.is_invalid() => h,
                _ => {
                    return Err(overseer_common::ProcessError::kill_failed(
                        pid.to_string(),
                        "Failed to open process for termination".to_string(),
                    ));
                }
            };

            // Terminate process with exit code 1
            let result = TerminateProcess(handle, 1);

            let _ = CloseHandle(handle);

            result.map_err(|e| {
                overseer_common::ProcessError::kill_failed(
                    pid.to_string(),
                    format!("TerminateProcess failed: {}", e),
                )
            })
        }
    }
}
