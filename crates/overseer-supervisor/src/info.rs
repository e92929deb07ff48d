//! Process records and handles.
//!
//! [`ProcessInfo`] is the mutable record tracking one external process:
//! identity, timestamps, outcome, capture buffers, and extension metadata.
//! The OS `Child` itself lives inside the exit-monitor task (which reaps
//! it); the [`ProcessHandle`] kept on the record carries what the
//! termination path needs — the pid, the writable stdin, and the shared
//! exit record that the monitor stamps when the process ends.

use crate::extensions::Extensions;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::process::ChildStdin;
use tokio::task::JoinHandle;

/// Exit outcome shared between the record, the exit monitor, and the
/// termination path. First writer wins: once the code is set the record is
/// terminal and later stamps are ignored.
#[derive(Debug, Default)]
pub(crate) struct ExitRecord {
    pub(crate) code: Option<i32>,
    pub(crate) exited_at: Option<DateTime<Utc>>,
}

pub(crate) type SharedExit = Arc<Mutex<ExitRecord>>;

pub(crate) type SharedBuffer = Arc<Mutex<String>>;

impl ExitRecord {
    /// Record the exit outcome unless one is already present.
    pub(crate) fn stamp(&mut self, code: i32, at: DateTime<Utc>) {
        if self.code.is_none() {
            self.code = Some(code);
            self.exited_at = Some(at);
        }
    }
}

/// Live-process handle: everything Stop/Kill need once the `Child` has
/// been handed to the exit monitor.
pub struct ProcessHandle {
    pid: u32,
    stdin: Option<ChildStdin>,
    exit: SharedExit,
    // Detached on drop; the monitor keeps running and reaps the child.
    #[allow(dead_code)]
    monitor: Option<JoinHandle<()>>,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        stdin: Option<ChildStdin>,
        exit: SharedExit,
        monitor: JoinHandle<()>,
    ) -> Self {
        Self {
            pid,
            stdin,
            exit,
            monitor: Some(monitor),
        }
    }

    /// Handle for a process resolved from a bare pid. No stdin, no monitor;
    /// liveness comes from the OS existence check alone.
    pub fn from_pid(pid: u32) -> Self {
        Self {
            pid,
            stdin: None,
            exit: SharedExit::default(),
            monitor: None,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process was launched with a writable stdin that is still
    /// open.
    pub fn has_stdin(&self) -> bool {
        self.stdin.is_some()
    }

    /// Take the writable stdin, leaving the slot empty.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Close the stdin stream if present. Returns whether one was open.
    pub fn close_stdin(&mut self) -> bool {
        self.stdin.take().is_some()
    }

    /// Whether the exit monitor has recorded a terminal outcome.
    pub fn has_exited(&self) -> bool {
        self.exit.lock().code.is_some()
    }

    pub(crate) fn shared_exit(&self) -> SharedExit {
        Arc::clone(&self.exit)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("has_stdin", &self.stdin.is_some())
            .field("has_exited", &self.has_exited())
            .finish()
    }
}

/// Mutable record describing one external process.
pub struct ProcessInfo {
    pid: Option<u32>,
    file_path: String,
    arguments: String,
    start_time: Option<DateTime<Utc>>,
    exit: SharedExit,
    stdout_capture: SharedBuffer,
    stderr_capture: SharedBuffer,
    extensions: Extensions,
    handle: Option<ProcessHandle>,
}

impl ProcessInfo {
    /// Build the record before the process exists, so identity fields are
    /// in place even if a later launch step fails.
    pub(crate) fn new(file_path: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            pid: None,
            file_path: file_path.into(),
            arguments: arguments.into(),
            start_time: None,
            exit: SharedExit::default(),
            stdout_capture: SharedBuffer::default(),
            stderr_capture: SharedBuffer::default(),
            extensions: Extensions::new(),
            handle: None,
        }
    }

    /// Set pid and start time together, before any event can fire.
    pub(crate) fn mark_started(&mut self, pid: u32, at: DateTime<Utc>) {
        self.pid = Some(pid);
        self.start_time = Some(at);
    }

    pub(crate) fn attach_handle(&mut self, handle: ProcessHandle) {
        self.handle = Some(handle);
    }

    /// Take the handle for the termination path. The record keeps its own
    /// clone of the shared exit record, so outcome fields stay readable.
    pub(crate) fn take_handle(&mut self) -> Option<ProcessHandle> {
        self.handle.take()
    }

    pub(crate) fn shared_exit(&self) -> SharedExit {
        Arc::clone(&self.exit)
    }

    pub(crate) fn stdout_buffer(&self) -> SharedBuffer {
        Arc::clone(&self.stdout_capture)
    }

    pub(crate) fn stderr_buffer(&self) -> SharedBuffer {
        Arc::clone(&self.stderr_capture)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The assembled argument string the process was launched with.
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit.lock().code
    }

    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        self.exit.lock().exited_at
    }

    /// Whether the record still owns a handle for a process that has not
    /// been observed to end.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.exit_code().is_none()
    }

    /// Captured standard output. Empty unless capture was requested.
    pub fn captured_stdout(&self) -> String {
        self.stdout_capture.lock().clone()
    }

    /// Captured standard error. Empty unless capture was requested.
    pub fn captured_stderr(&self) -> String {
        self.stderr_capture.lock().clone()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Point-in-time view of the record, suitable for logging or
    /// persistence.
    pub fn snapshot(&self) -> ProcessSnapshot {
        let exit = self.exit.lock();
        ProcessSnapshot {
            pid: self.pid,
            file_path: self.file_path.clone(),
            arguments: self.arguments.clone(),
            start_time: self.start_time,
            exit_time: exit.exited_at,
            exit_code: exit.code,
            running: self.handle.is_some() && exit.code.is_none(),
        }
    }
}

impl std::fmt::Debug for ProcessInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessInfo")
            .field("pid", &self.pid)
            .field("file_path", &self.file_path)
            .field("arguments", &self.arguments)
            .field("start_time", &self.start_time)
            .field("exit_code", &self.exit_code())
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Serializable snapshot of a [`ProcessInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: Option<u32>,
    pub file_path: String,
    pub arguments: String,
    pub start_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub running: bool,
}
