//! Stop orchestration.
//!
//! [`stop`] decides whether a process needs graceful shutdown or is
//! already gone, drives the attempt, and falls back to the kill primitive
//! on timeout or error. It never returns an error: outcomes are
//! communicated exclusively through the completion and error callbacks,
//! and completion is always eventually signaled.

use crate::events::{CompletionCallback, ErrorCallback};
use crate::info::{ProcessHandle, ProcessInfo};
use crate::kill::{self, wait_for_exit, EXIT_POLL_INTERVAL};
use async_trait::async_trait;
use overseer_common::{ProcessError, ProcessResult};
use overseer_process::process_exists;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Default bound on the wait for natural termination after the graceful
/// close step.
pub const DEFAULT_GRACEFUL_EXIT_WAIT: Duration = Duration::from_millis(456);

/// Bound on the best-effort wait for the exit monitor to record the
/// outcome before completion is signaled.
const EXIT_REFRESH_WAIT: Duration = Duration::from_millis(100);

/// Pluggable graceful-close step used by Stop and as the optional
/// pre-close hook of Kill.
#[async_trait]
pub trait GracefulClose: Send + Sync {
    async fn try_close(&self, handle: &mut ProcessHandle) -> ProcessResult<()>;
}

/// Default graceful-close step: write an interactive `exit` line to the
/// child's standard input and close the stream.
///
/// This assumes the child is an interactive shell reading commands from
/// stdin. A non-interactive child simply ignores the line and runs out the
/// stop timeout, after which the escalation takes over.
pub struct InteractiveExitClose;

#[async_trait]
impl GracefulClose for InteractiveExitClose {
    async fn try_close(&self, handle: &mut ProcessHandle) -> ProcessResult<()> {
        let Some(mut stdin) = handle.take_stdin() else {
            // Nothing to close; fall through to the wait
            return Ok(());
        };

        let pid = handle.pid();
        stdin.write_all(b"exit\n").await.map_err(|e| {
            ProcessError::stop_failed(pid.to_string(), format!("Failed to write exit command: {}", e))
        })?;
        stdin.shutdown().await.map_err(|e| {
            ProcessError::stop_failed(pid.to_string(), format!("Failed to close stdin: {}", e))
        })?;
        Ok(())
    }
}

/// Options for one [`stop`] call.
#[derive(Clone)]
pub struct StopOptions {
    /// Bound on the wait for natural termination after the graceful close.
    pub wait: Duration,
    /// Graceful-close step; `None` uses [`InteractiveExitClose`].
    pub graceful_close: Option<Arc<dyn GracefulClose>>,
    pub on_completed: Option<CompletionCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self {
            wait: DEFAULT_GRACEFUL_EXIT_WAIT,
            graceful_close: None,
            on_completed: None,
            on_error: None,
        }
    }
}

impl StopOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn graceful_close(mut self, closer: Arc<dyn GracefulClose>) -> Self {
        self.graceful_close = Some(closer);
        self
    }

    pub fn on_completed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_completed = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ProcessError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for StopOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopOptions")
            .field("wait", &self.wait)
            .field("has_graceful_close", &self.graceful_close.is_some())
            .finish()
    }
}

/// Stop the process tracked by `info`.
///
/// Exactly one completion signal fires per call, whichever path was taken.
/// Calling stop on a record whose process already ended (or that never
/// started) releases any residual handle and completes immediately.
pub async fn stop(info: &mut ProcessInfo, options: StopOptions) {
    match info.take_handle() {
        None => {
            debug!(path = %info.file_path(), "stop: no live handle, completing");
            signal_completed(&options);
        }
        Some(handle) if handle.has_exited() => {
            // Already reaped: the handle is residual, release it
            debug!(pid = handle.pid(), "stop: process already terminal, releasing handle");
            drop(handle);
            signal_completed(&options);
        }
        Some(mut handle) => {
            stop_live(&mut handle, &options).await;
            refresh_exit(&handle, &options).await;
            // Release: the stdin slot dies with the handle, the monitor
            // task keeps running detached until the child is reaped
            drop(handle);
            signal_completed(&options);
        }
    }
}

/// Drive the graceful attempt and escalate as needed. Never propagates.
async fn stop_live(handle: &mut ProcessHandle, options: &StopOptions) {
    let pid = handle.pid();

    let closer: Arc<dyn GracefulClose> = options
        .graceful_close
        .clone()
        .unwrap_or_else(|| Arc::new(InteractiveExitClose));

    if let Err(e) = closer.try_close(handle).await {
        // A failing graceful attempt must not block termination
        warn!(pid, error = %e, "graceful close failed");
        report_error(options, &e);
    }

    match wait_for_exit(handle, options.wait).await {
        Ok(true) => {
            debug!(pid, "process ended within the graceful wait");
        }
        Ok(false) => {
            warn!(pid, "graceful stop timed out, escalating to kill");
            kill::kill_handle(handle, None, None, options.on_error.clone()).await;
        }
        Err(e) => {
            // Unexpected failure of the attempt itself: unconditional
            // kill-and-release, surfacing only a fallback failure
            warn!(pid, error = %e, "stop attempt failed, falling back to unconditional kill");
            if let Err(fallback) = kill::force_kill_if_alive(pid) {
                report_error(options, &fallback);
            }
        }
    }
}

/// Best-effort re-read of the exit outcome before completion: give the
/// exit monitor a bounded window to record the status of a process that is
/// now gone. Probe failures go to the error callback, never out.
async fn refresh_exit(handle: &ProcessHandle, options: &StopOptions) {
    let deadline = tokio::time::Instant::now() + EXIT_REFRESH_WAIT;
    loop {
        if handle.has_exited() {
            return;
        }
        match process_exists(handle.pid()) {
            // Still alive: the stop failed outright, nothing to refresh
            Ok(true) => return,
            // Gone: keep waiting for the monitor to stamp the record
            Ok(false) => {}
            Err(e) => {
                report_error(options, &e);
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return;
        }
        tokio::time::sleep(EXIT_POLL_INTERVAL).await;
    }
}

fn signal_completed(options: &StopOptions) {
    if let Some(cb) = &options.on_completed {
        cb();
    }
}

fn report_error(options: &StopOptions, error: &ProcessError) {
    if let Some(cb) = &options.on_error {
        cb(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_stop_without_handle_signals_completion() {
        let mut info = ProcessInfo::new("/bin/echo", "hello");
        let completed = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let completed_clone = Arc::clone(&completed);
        let errors_clone = Arc::clone(&errors);
        let options = StopOptions::new()
            .on_completed(move || {
                completed_clone.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |_e| {
                errors_clone.fetch_add(1, Ordering::SeqCst);
            });

        stop(&mut info, options).await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_twice_completes_both_times() {
        let mut info = ProcessInfo::new("/bin/echo", "hello");
        let completed = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let completed_clone = Arc::clone(&completed);
            let options = StopOptions::new().on_completed(move || {
                completed_clone.fetch_add(1, Ordering::SeqCst);
            });
            stop(&mut info, options).await;
        }
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_wait_matches_documented_bound() {
        let options = StopOptions::default();
        assert_eq!(options.wait, Duration::from_millis(456));
    }
}
