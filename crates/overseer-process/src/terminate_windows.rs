//! Windows-specific cooperative termination.
//!
//! Windows has no SIGTERM equivalent for arbitrary processes; the closest
//! cooperative request for console children is `GenerateConsoleCtrlEvent`
//! with Ctrl+Break. Console APIs are process-global, so all operations in
//! this module serialize on one lock. For PIDs that are already dead we
//! instead apply the `AttachConsole` reset: attaching to a dead PID fails,
//! and that failure restores the parent console's signal state.

use std::sync::Mutex;
use std::time::Duration;
use windows::Win32::System::Console::{AttachConsole, GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

/// Global lock for console operations.
static CONSOLE_OPERATION_LOCK: Mutex<()> = Mutex::new(());

/// Send a termination signal to a Windows process.
///
/// # Arguments
/// * `pid` - Process ID to terminate
/// * `is_dead` - Whether the process is known to be dead (console fix only)
/// * `timeout` - Bound on the signal delivery attempt
pub fn send_termination_signal(pid: u32, is_dead: bool, timeout: Duration) -> Result<(), String> {
    if pid == 0 {
        return Err(format!("Invalid PID: {}", pid));
    }

    let _lock = CONSOLE_OPERATION_LOCK
        .lock()
        .map_err(|e| format!("Failed to acquire console lock: {}", e))?;

    // Verify the claim before applying the dead-PID path
    let actually_dead = if is_dead {
        !crate::process_exists(pid).unwrap_or(false)
    } else {
        false
    };

    if actually_dead {
        console_signal_fix(pid)
    } else {
        send_ctrl_break_to_process(pid, timeout)
    }
}

/// Console reset via the AttachConsole dead-PID path.
fn console_signal_fix(dead_pid: u32) -> Result<(), String> {
    match attach_console(dead_pid) {
        Ok(_) => Err(format!(
            "AttachConsole unexpectedly succeeded for dead PID {}",
            dead_pid
        )),
        // Expected to fail for a dead process; the failed attach resets state
        Err(_) => Ok(()),
    }
}

/// Send Ctrl+Break with timeout protection.
///
/// `GenerateConsoleCtrlEvent` can block when the console subsystem is in a
/// bad state, so the call runs on its own thread with a receive timeout.
fn send_ctrl_break_to_process(pid: u32, timeout: Duration) -> Result<(), String> {
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let result = generate_console_ctrl_event(pid);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("Failed to send Ctrl+Break to PID {}: {}", pid, e)),
        Err(_) => Err(format!(
            "Timeout sending Ctrl+Break to PID {} after {:?}",
            pid, timeout
        )),
    }
}

fn attach_console(pid: u32) -> Result<(), String> {
    unsafe { AttachConsole(pid).map_err(|_| "AttachConsole failed".to_string()) }
}

fn generate_console_ctrl_event(pid: u32) -> Result<(), String> {
    unsafe {
        GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid)
            .map_err(|_| "GenerateConsoleCtrlEvent failed".to_string())
    }
}
