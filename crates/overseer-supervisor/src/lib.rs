//! # Overseer Supervisor
//!
//! External-process supervision: start a child process with redirected
//! I/O, observe its lifecycle asynchronously, and terminate it through a
//! graceful-then-forced escalation.
//!
//! The flow is: [`start`] returns a populated [`ProcessInfo`] immediately;
//! background readers deliver output and error notifications concurrently;
//! [`stop`] attempts a graceful close and escalates to [`kill`] on timeout
//! or error. The exit notification fires exactly once per process,
//! whichever path ends it.
//!
//! ```no_run
//! use overseer_supervisor::{start, stop, ProcessEvents, StartOptions, StopOptions};
//!
//! # async fn example() -> overseer_common::ProcessResult<()> {
//! let events = ProcessEvents::new()
//!     .on_output(|line| println!("child: {line}"))
//!     .on_exit(|code| println!("exited with {code}"));
//!
//! let mut info = start(
//!     StartOptions::new("/usr/local/bin/worker").arg("--serve").capture_output(true),
//!     events,
//! )
//! .await?;
//!
//! stop(&mut info, StopOptions::new().on_completed(|| println!("stopped"))).await;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod extensions;
pub mod info;
pub mod kill;
pub mod launcher;
pub mod stop;

// Re-export the public surface
pub use events::{
    CompletionCallback, ErrorCallback, ExitCallback, KilledCallback, OutputCallback, ProcessEvents,
};
pub use extensions::Extensions;
pub use info::{ProcessHandle, ProcessInfo, ProcessSnapshot};
pub use kill::{kill, KillTarget};
pub use launcher::{start, start_shell, StartOptions};
pub use stop::{stop, GracefulClose, InteractiveExitClose, StopOptions, DEFAULT_GRACEFUL_EXIT_WAIT};
