//! Process creation, supervision, and image replacement.
//!
//! Wraps `fork(2)`, `waitpid(2)`, and `execvp(3)`. The parent gets a
//! one-shot [`ChildHandle`] that is consumed by [`wait_child`], so a child
//! can be waited on exactly once.

use std::convert::Infallible;

use minicurn_common::error::{MinicurnError, Result};
use minicurn_common::types::ExitOutcome;

/// One-shot waitable handle to a forked child, held by the parent only.
#[derive(Debug, PartialEq, Eq)]
pub struct ChildHandle {
    pid: i32,
}

impl ChildHandle {
    /// Wraps a raw PID as seen from the parent's PID namespace.
    pub const fn from_raw(pid: i32) -> Self {
        Self { pid }
    }

    /// PID of the child in the parent's PID namespace.
    pub const fn pid(&self) -> i32 {
        self.pid
    }
}

/// Which side of a fork the caller is on.
#[derive(Debug, PartialEq, Eq)]
pub enum ForkOutcome {
    /// Caller is the parent and owns the child's handle.
    Parent(ChildHandle),
    /// Caller is the freshly forked child.
    Child,
}

/// Forks the calling process.
///
/// The caller must be single-threaded: only the calling thread survives in
/// the child, and any lock held by another thread stays locked forever.
/// [`crate::preflight::ensure_single_threaded`] checks this.
///
/// # Errors
///
/// Returns [`MinicurnError::Fork`] if `fork(2)` fails.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn fork_process() -> Result<ForkOutcome> {
    use nix::unistd::{ForkResult, fork};

    // SAFETY: the launcher never spawns threads, so the child inherits a
    // consistent address space and may run arbitrary code before exec.
    match unsafe { fork() }.map_err(|e| MinicurnError::Fork { source: e.into() })? {
        ForkResult::Parent { child } => {
            tracing::debug!(child = child.as_raw(), "forked");
            Ok(ForkOutcome::Parent(ChildHandle::from_raw(child.as_raw())))
        }
        ForkResult::Child => Ok(ForkOutcome::Child),
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error.
#[cfg(not(target_os = "linux"))]
pub fn fork_process() -> Result<ForkOutcome> {
    Err(MinicurnError::Unsupported { operation: "fork" })
}

/// Blocks until the child terminates and returns how it ended.
///
/// There is no timeout: a child that never exits blocks the caller forever.
/// Interrupted waits are resumed.
///
/// # Errors
///
/// Returns [`MinicurnError::Wait`] if `waitpid(2)` fails.
#[cfg(target_os = "linux")]
pub fn wait_child(handle: ChildHandle) -> Result<ExitOutcome> {
    use nix::errno::Errno;
    use nix::sys::wait::{WaitStatus, waitpid};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(handle.pid);
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitOutcome::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, core_dumped)) => {
                return Ok(ExitOutcome::Signaled {
                    signal: signal.as_str().to_string(),
                    number: signal as i32,
                    core_dumped,
                });
            }
            Ok(status) => tracing::trace!(?status, "ignoring non-terminal wait status"),
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(MinicurnError::Wait {
                    pid: handle.pid,
                    source: e.into(),
                });
            }
        }
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error.
#[cfg(not(target_os = "linux"))]
pub fn wait_child(_handle: ChildHandle) -> Result<ExitOutcome> {
    Err(MinicurnError::Unsupported { operation: "wait" })
}

/// Replaces the current process image with `command`, resolving the
/// program through `PATH`.
///
/// Never returns on success.
///
/// # Errors
///
/// Returns [`MinicurnError::Exec`] if the command is empty, contains a NUL
/// byte, or `execvp(3)` fails.
#[cfg(target_os = "linux")]
pub fn exec_command(command: &[String]) -> Result<Infallible> {
    use std::ffi::CString;

    let program = command.first().map_or_else(String::new, Clone::clone);
    let exec_error = |source: std::io::Error| MinicurnError::Exec {
        command: program.clone(),
        source,
    };

    if command.is_empty() {
        return Err(exec_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        )));
    }

    let argv = command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| exec_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    tracing::info!(program = %program, args = ?&command[1..], "exec");
    nix::unistd::execvp(&argv[0], &argv).map_err(|e| exec_error(e.into()))
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error.
#[cfg(not(target_os = "linux"))]
pub fn exec_command(_command: &[String]) -> Result<Infallible> {
    Err(MinicurnError::Unsupported { operation: "exec" })
}
