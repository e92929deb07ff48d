//! Event fan-out between the OS process and the caller.
//!
//! Raw stream lines and the exit notification are bridged to capture
//! buffers and caller-supplied callbacks through one unbounded channel per
//! process: reader tasks only parse lines and send, and a dispatcher task
//! does the buffer appends and callback invocations. Callbacks therefore
//! never run on the stream-reading path and cannot stall the pipes.

use crate::info::{SharedBuffer, SharedExit};
use chrono::{DateTime, Utc};
use overseer_common::ProcessError;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Callback invoked with each line of standard output or standard error.
pub type OutputCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback invoked once when the process is observed to have ended.
pub type ExitCallback = Arc<dyn Fn(i32) + Send + Sync>;

/// Callback invoked with failures absorbed by Stop/Kill.
pub type ErrorCallback = Arc<dyn Fn(&ProcessError) + Send + Sync>;

/// Callback invoked when a Stop call has run to completion.
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback invoked when a Kill call has finished; carries the pid of the
/// killed handle, or `None` when there was no process to kill.
pub type KilledCallback = Arc<dyn Fn(Option<u32>) + Send + Sync>;

/// Caller-supplied event sinks for a launched process.
#[derive(Clone, Default)]
pub struct ProcessEvents {
    pub on_exit: Option<ExitCallback>,
    pub on_output: Option<OutputCallback>,
    pub on_error: Option<OutputCallback>,
}

impl ProcessEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exit(mut self, f: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Arc::new(f));
        self
    }

    pub fn on_output(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_output = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for ProcessEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEvents")
            .field("on_exit", &self.on_exit.is_some())
            .field("on_output", &self.on_output.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Stdout,
    Stderr,
}

pub(crate) enum ProcessEvent {
    Line {
        stream: StreamKind,
        line: String,
    },
    Exited {
        code: i32,
        at: DateTime<Utc>,
    },
}

pub(crate) type EventSender = mpsc::UnboundedSender<ProcessEvent>;

/// Spawn a line-oriented reader for one redirected stream.
///
/// Reads run immediately so a chatty child cannot stall on a full pipe.
/// The task ends at EOF (which coincides with process exit) or on a read
/// error.
pub(crate) fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    pid: u32,
    tx: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    // The dispatcher may already be gone on teardown
                    if tx.send(ProcessEvent::Line { stream: kind, line }).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!(pid, stream = ?kind, "stream ended");
                    break;
                }
                Err(e) => {
                    error!(pid, stream = ?kind, error = %e, "error reading from stream");
                    break;
                }
            }
        }
    })
}

/// Spawn the dispatcher that fans events out to capture buffers and
/// caller callbacks. Ends after delivering the exit notification.
pub(crate) fn spawn_dispatcher(
    mut rx: mpsc::UnboundedReceiver<ProcessEvent>,
    stdout_capture: SharedBuffer,
    stderr_capture: SharedBuffer,
    capture_output: bool,
    events: ProcessEvents,
    exit: SharedExit,
    pid: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProcessEvent::Line { stream, line } => {
                    let (buffer, callback) = match stream {
                        StreamKind::Stdout => (&stdout_capture, &events.on_output),
                        StreamKind::Stderr => (&stderr_capture, &events.on_error),
                    };
                    if capture_output {
                        let mut buf = buffer.lock();
                        buf.push_str(&line);
                        buf.push('\n');
                    }
                    if let Some(cb) = callback {
                        cb(&line);
                    }
                }
                ProcessEvent::Exited { code, at } => {
                    // Stamp before notifying so observers of the callback
                    // always see a terminal record
                    exit.lock().stamp(code, at);
                    let code = exit.lock().code.unwrap_or(code);
                    if let Some(cb) = &events.on_exit {
                        cb(code);
                    }
                    debug!(pid, code, "exit notification delivered");
                    break;
                }
            }
        }
    })
}

/// Map an exit status to the code recorded on the process record.
///
/// A signal death on Unix maps to the conventional `128 + signal`; a
/// status that cannot be decoded at all maps to `-1`.
pub(crate) fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_code_of(status)
}

#[cfg(unix)]
fn signal_code_of(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => 128 + signal,
        None => {
            tracing::warn!("exit status carried neither code nor signal");
            -1
        }
    }
}

#[cfg(not(unix))]
fn signal_code_of(_status: &std::process::ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_dispatcher_captures_and_forwards_lines() {
        let (tx, rx) = mpsc::unbounded_channel();
        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let exit = SharedExit::default();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let events = ProcessEvents::new().on_output(move |line| {
            seen_clone.lock().push(line.to_string());
        });

        let task = spawn_dispatcher(
            rx,
            Arc::clone(&stdout),
            Arc::clone(&stderr),
            true,
            events,
            Arc::clone(&exit),
            1,
        );

        tx.send(ProcessEvent::Line {
            stream: StreamKind::Stdout,
            line: "one".to_string(),
        })
        .unwrap();
        tx.send(ProcessEvent::Line {
            stream: StreamKind::Stderr,
            line: "two".to_string(),
        })
        .unwrap();
        tx.send(ProcessEvent::Exited {
            code: 0,
            at: Utc::now(),
        })
        .unwrap();

        task.await.unwrap();
        assert_eq!(*stdout.lock(), "one\n");
        assert_eq!(*stderr.lock(), "two\n");
        assert_eq!(*seen.lock(), vec!["one".to_string()]);
        assert_eq!(exit.lock().code, Some(0));
    }

    #[tokio::test]
    async fn test_dispatcher_skips_capture_when_disabled() {
        let (tx, rx) = mpsc::unbounded_channel();
        let stdout = SharedBuffer::default();
        let task = spawn_dispatcher(
            rx,
            Arc::clone(&stdout),
            SharedBuffer::default(),
            false,
            ProcessEvents::new(),
            SharedExit::default(),
            1,
        );

        tx.send(ProcessEvent::Line {
            stream: StreamKind::Stdout,
            line: "quiet".to_string(),
        })
        .unwrap();
        tx.send(ProcessEvent::Exited {
            code: 0,
            at: Utc::now(),
        })
        .unwrap();

        task.await.unwrap();
        assert!(stdout.lock().is_empty());
    }

    #[tokio::test]
    async fn test_exit_event_delivered_once_with_terminal_record() {
        let (tx, rx) = mpsc::unbounded_channel();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let exit = SharedExit::default();

        let events = ProcessEvents::new().on_exit(move |_code| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        let task = spawn_dispatcher(
            rx,
            SharedBuffer::default(),
            SharedBuffer::default(),
            false,
            events,
            Arc::clone(&exit),
            1,
        );

        tx.send(ProcessEvent::Exited {
            code: 7,
            at: Utc::now(),
        })
        .unwrap();
        // The dispatcher stops at the first exit event; a second send can
        // only land in a closed channel
        task.await.unwrap();
        assert!(tx
            .send(ProcessEvent::Exited {
                code: 8,
                at: Utc::now(),
            })
            .is_err());

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(exit.lock().code, Some(7));
    }
}
