//! Forced termination.
//!
//! [`kill`] drives a live handle (or a process resolved from a bare pid)
//! through a bounded escalation: optional pre-close hook, short existence
//! recheck, cooperative termination request, and finally an unconditional
//! kill. Every failure path still reaches the terminal "killed" signal, so
//! a supervisor driving termination can never block on a wedged child.

use crate::events::{ErrorCallback, KilledCallback};
use crate::info::ProcessHandle;
use crate::stop::GracefulClose;
use overseer_common::{ProcessError, ProcessResult};
use overseer_process::{force_kill, process_exists, terminate_gracefully};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Wait before rechecking whether the process is already gone.
pub(crate) const EXISTENCE_RECHECK_WAIT: Duration = Duration::from_millis(123);

/// Wait after the cooperative termination request before forcing.
pub(crate) const FORCED_ESCALATION_WAIT: Duration = Duration::from_millis(456);

/// Polling cadence for the bounded exit waits.
pub(crate) const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Target of a [`kill`] call.
pub enum KillTarget {
    /// A live handle, or `None` for the idempotent no-op case.
    Handle(Option<ProcessHandle>),
    /// A numeric process identifier, resolved before any kill.
    Pid(u32),
}

impl From<Option<ProcessHandle>> for KillTarget {
    fn from(handle: Option<ProcessHandle>) -> Self {
        Self::Handle(handle)
    }
}

impl From<ProcessHandle> for KillTarget {
    fn from(handle: ProcessHandle) -> Self {
        Self::Handle(Some(handle))
    }
}

impl From<u32> for KillTarget {
    fn from(pid: u32) -> Self {
        Self::Pid(pid)
    }
}

/// Force termination of a process.
///
/// With `KillTarget::Handle(None)` the killed signal fires immediately
/// with no pid and the error callback is never invoked. A pid that
/// resolves to no live process reports through the error callback and
/// performs no kill.
pub async fn kill(
    target: impl Into<KillTarget>,
    try_close: Option<Arc<dyn GracefulClose>>,
    on_killed: Option<KilledCallback>,
    on_error: Option<ErrorCallback>,
) {
    match target.into() {
        KillTarget::Handle(None) => {
            debug!("kill: no handle, signalling killed immediately");
            signal_killed(&on_killed, None);
        }
        KillTarget::Handle(Some(mut handle)) => {
            kill_handle(&mut handle, try_close, on_killed, on_error).await;
        }
        KillTarget::Pid(pid) => match process_exists(pid) {
            Ok(true) => {
                let mut handle = ProcessHandle::from_pid(pid);
                kill_handle(&mut handle, try_close, on_killed, on_error).await;
            }
            Ok(false) => {
                debug!(pid, "kill: pid resolves to no live process");
                report_error(&on_error, &ProcessError::not_found(pid.to_string()));
            }
            Err(e) => {
                report_error(&on_error, &e);
            }
        },
    }
}

/// Run the escalation on a live handle. Never propagates; the killed
/// signal is always attempted.
pub(crate) async fn kill_handle(
    handle: &mut ProcessHandle,
    try_close: Option<Arc<dyn GracefulClose>>,
    on_killed: Option<KilledCallback>,
    on_error: Option<ErrorCallback>,
) {
    let pid = handle.pid();

    if pid == 0 {
        report_error(
            &on_error,
            &ProcessError::configuration("0", "Cannot kill an unidentified process"),
        );
        signal_killed(&on_killed, Some(pid));
        return;
    }

    if let Err(e) = escalate(handle, try_close.as_deref(), &on_error).await {
        warn!(pid, error = %e, "kill escalation failed, applying last-resort terminate");
        if let Err(last) = force_kill_if_alive(pid) {
            report_error(&on_error, &last);
        }
    }

    signal_killed(&on_killed, Some(pid));
}

/// The escalation ladder proper. Any error propagates to the last-resort
/// handler in [`kill_handle`].
async fn escalate(
    handle: &mut ProcessHandle,
    try_close: Option<&dyn GracefulClose>,
    on_error: &Option<ErrorCallback>,
) -> ProcessResult<()> {
    let pid = handle.pid();

    // Pre-close hook: a failing graceful attempt must not block the
    // forced termination below
    if let Some(closer) = try_close {
        if let Err(e) = closer.try_close(handle).await {
            warn!(pid, error = %e, "pre-close hook failed");
            report_error(on_error, &e);
        }
    }

    // Short recheck: the process may already be gone
    if wait_for_exit(handle, EXISTENCE_RECHECK_WAIT).await? {
        debug!(pid, "process exited before forced termination");
        return Ok(());
    }

    if handle.close_stdin() {
        // The child was launched with a writable stdin: closing it and
        // requesting cooperative termination gives its main loop a chance
        // to wind down before the hard kill
        terminate_gracefully(pid)?;
        if !wait_for_exit(handle, FORCED_ESCALATION_WAIT).await? {
            warn!(pid, "cooperative termination ignored, forcing");
            force_kill(pid)?;
        }
    } else if !wait_for_exit(handle, Duration::ZERO).await? {
        force_kill(pid)?;
    }

    Ok(())
}

/// Force-kill `pid` unless it is already gone.
pub(crate) fn force_kill_if_alive(pid: u32) -> ProcessResult<()> {
    if pid == 0 {
        return Err(ProcessError::configuration(
            "0",
            "Cannot kill an unidentified process",
        ));
    }
    match process_exists(pid)? {
        false => Ok(()),
        true => force_kill(pid),
    }
}

/// Poll until the handle's process is observed to have ended or the
/// timeout elapses. Checks before sleeping, so a zero timeout still
/// performs one probe.
pub(crate) async fn wait_for_exit(
    handle: &ProcessHandle,
    timeout: Duration,
) -> ProcessResult<bool> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if handle.has_exited() {
            return Ok(true);
        }
        if !process_exists(handle.pid())? {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(EXIT_POLL_INTERVAL).await;
    }
}

fn signal_killed(on_killed: &Option<KilledCallback>, pid: Option<u32>) {
    if let Some(cb) = on_killed {
        cb(pid);
    }
}

fn report_error(on_error: &Option<ErrorCallback>, error: &ProcessError) {
    if let Some(cb) = on_error {
        cb(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counters() -> (
        Arc<AtomicUsize>,
        KilledCallback,
        Arc<AtomicUsize>,
        ErrorCallback,
    ) {
        let killed = Arc::new(AtomicUsize::new(0));
        let killed_clone = Arc::clone(&killed);
        let on_killed: KilledCallback = Arc::new(move |_pid| {
            killed_clone.fetch_add(1, Ordering::SeqCst);
        });

        let errors = Arc::new(AtomicUsize::new(0));
        let errors_clone = Arc::clone(&errors);
        let on_error: ErrorCallback = Arc::new(move |_e| {
            errors_clone.fetch_add(1, Ordering::SeqCst);
        });

        (killed, on_killed, errors, on_error)
    }

    #[tokio::test]
    async fn test_kill_without_handle_signals_killed_only() {
        let (killed, on_killed, errors, on_error) = counters();
        let seen_pid = Arc::new(parking_lot::Mutex::new(Some(1u32)));
        let seen_clone = Arc::clone(&seen_pid);
        let capture_pid: KilledCallback = Arc::new(move |pid| {
            *seen_clone.lock() = pid;
        });

        kill(KillTarget::Handle(None), None, Some(capture_pid), Some(on_error)).await;
        assert_eq!(*seen_pid.lock(), None);
        assert_eq!(errors.load(Ordering::SeqCst), 0);

        // The counting variant, for symmetry with the other tests
        kill(KillTarget::Handle(None), None, Some(on_killed), None).await;
        assert_eq!(killed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kill_unresolvable_pid_reports_error_without_killed() {
        let (killed, on_killed, errors, on_error) = counters();
        let unlikely_pid = if cfg!(windows) { 99999999 } else { 9999999 };

        kill(unlikely_pid, None, Some(on_killed), Some(on_error)).await;
        assert_eq!(killed.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_force_kill_if_alive_on_dead_pid_is_noop() {
        let unlikely_pid = if cfg!(windows) { 99999999 } else { 9999999 };
        assert!(force_kill_if_alive(unlikely_pid).is_ok());
    }

    #[test]
    fn test_force_kill_if_alive_rejects_pid_zero() {
        assert!(force_kill_if_alive(0).is_err());
    }
}
