//! Process launching.
//!
//! [`start`] creates the OS process with all three standard streams
//! redirected, wires the event fan-out, and hands the `Child` to an exit
//! monitor before returning. The returned [`ProcessInfo`] always has its
//! pid and start time populated; spawn failure is the one error that
//! propagates synchronously, since no lifecycle consumer exists yet to
//! notify.

use crate::events::{self, ProcessEvents, StreamKind};
use crate::info::{ProcessHandle, ProcessInfo};
use chrono::Utc;
use overseer_common::{ProcessError, ProcessResult};
use overseer_process::{derive_working_directory, validate_executable};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Bound on how long the exit monitor lets in-flight reads drain before
/// emitting the exit event. Best-effort ordering, not a hard join.
const READER_DRAIN_WAIT: Duration = Duration::from_millis(200);

/// Exit code recorded when the status cannot be read at all.
const SYNTHESIZED_FAILURE_CODE: i32 = -1;

/// Launch configuration for one external process.
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub file_path: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub capture_output: bool,
}

impl StartOptions {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            args: Vec::new(),
            working_directory: None,
            capture_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

/// Start an external process from an executable path and arguments.
pub async fn start(options: StartOptions, events: ProcessEvents) -> ProcessResult<ProcessInfo> {
    validate_executable(&options.file_path)?;

    let mut cmd = Command::new(&options.file_path);
    cmd.args(&options.args);

    let arguments = options.args.join(" ");
    spawn_supervised(
        cmd,
        options.file_path,
        arguments,
        options.working_directory,
        options.capture_output,
        events,
    )
    .await
}

/// Start a single command string under the platform's interactive shell.
///
/// `cmd /c "..."` on the Windows family, `/bin/bash -c` elsewhere. The
/// shell itself is a known interactive executable, so no working directory
/// is derived from it; pass one explicitly if the command needs it.
pub async fn start_shell(
    command: &str,
    working_directory: Option<PathBuf>,
    capture_output: bool,
    events: ProcessEvents,
) -> ProcessResult<ProcessInfo> {
    #[cfg(not(windows))]
    let (cmd, file_path, arguments) = {
        let (program, args) = overseer_process::bash_invocation(command);
        let mut c = Command::new(program);
        c.args(&args);
        (c, program.to_string(), args.join(" "))
    };

    #[cfg(windows)]
    let (cmd, file_path, arguments) = {
        let tail = overseer_process::cmd_invocation_tail(command);
        let mut c = Command::new(overseer_process::WINDOWS_SHELL);
        c.raw_arg(&tail);
        (c, overseer_process::WINDOWS_SHELL.to_string(), tail)
    };

    spawn_supervised(cmd, file_path, arguments, working_directory, capture_output, events).await
}

async fn spawn_supervised(
    mut cmd: Command,
    file_path: String,
    arguments: String,
    working_directory: Option<PathBuf>,
    capture_output: bool,
    events: ProcessEvents,
) -> ProcessResult<ProcessInfo> {
    // Record first, so identity fields exist even if a later step fails
    let mut info = ProcessInfo::new(&file_path, &arguments);

    let workdir = working_directory.or_else(|| derive_working_directory(&file_path));
    if let Some(dir) = &workdir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Non-interactive: the child gets no console window of its own
    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(&file_path, e.to_string()))?;

    let pid = child.id().unwrap_or(0);
    info.mark_started(pid, Utc::now());
    info!(pid, path = %file_path, "process started");

    let (tx, rx) = mpsc::unbounded_channel();

    // Readers go first: a child that fills its pipe before we read would
    // otherwise stall
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(events::spawn_line_reader(stdout, StreamKind::Stdout, pid, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(events::spawn_line_reader(stderr, StreamKind::Stderr, pid, tx.clone()));
    }
    let stdin = child.stdin.take();

    events::spawn_dispatcher(
        rx,
        info.stdout_buffer(),
        info.stderr_buffer(),
        capture_output,
        events,
        info.shared_exit(),
        pid,
    );

    // The monitor owns the Child from here: it reaps the process, lets the
    // readers drain, and emits the single exit event
    let monitor = tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => {
                let code = events::exit_code_of(&status);
                info!(pid, code, "process exited");
                code
            }
            Err(e) => {
                warn!(pid, error = %e, "failed to read exit status");
                SYNTHESIZED_FAILURE_CODE
            }
        };

        for reader in readers {
            let _ = tokio::time::timeout(READER_DRAIN_WAIT, reader).await;
        }

        let _ = tx.send(events::ProcessEvent::Exited {
            code,
            at: Utc::now(),
        });
    });

    let exit = info.shared_exit();
    info.attach_handle(ProcessHandle::new(pid, stdin, exit, monitor));
    Ok(info)
}
