//! Parent-side orchestration of a launch.

use minicurn_common::config::LaunchRequest;
use minicurn_common::error::Result;
use minicurn_common::types::ExitOutcome;
use minicurn_core::host::{Host, LinuxHost};
use minicurn_core::process::ForkOutcome;

use crate::child;

/// What the parent observed once the child terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    /// PID of the child in the launcher's PID namespace.
    pub child_pid: i32,
    /// How the child terminated.
    pub outcome: ExitOutcome,
}

/// Creates the jailed child and supervises it until it terminates.
#[derive(Debug, Default)]
pub struct Launcher<H: Host = LinuxHost> {
    host: H,
}

impl Launcher<LinuxHost> {
    /// Creates a launcher driving the real kernel.
    pub const fn new() -> Self {
        Self {
            host: LinuxHost::new(),
        }
    }
}

impl<H: Host> Launcher<H> {
    /// Creates a launcher driving a custom host.
    pub const fn with_host(host: H) -> Self {
        Self { host }
    }

    /// Host the launcher drives.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Runs `request` in a fresh jail and blocks until the child terminates.
    ///
    /// Creates the PID namespace, then forks. The parent waits exactly once;
    /// the child builds the jail and never returns from this call.
    ///
    /// # Errors
    ///
    /// Returns an error if preflight, the PID namespace, fork, or wait
    /// fails. Child-side failures are only visible through the returned
    /// [`LaunchReport::outcome`].
    pub fn launch(&self, request: &LaunchRequest) -> Result<LaunchReport> {
        tracing::info!(
            command = ?request.command(),
            pid = std::process::id(),
            "parent running"
        );

        self.host.preflight(request.rootfs())?;
        self.host.create_pid_namespace()?;

        match self.host.fork()? {
            ForkOutcome::Parent(handle) => {
                let child_pid = handle.pid();
                tracing::debug!(child_pid, "waiting for child");
                let outcome = self.host.wait(handle)?;
                tracing::info!(child_pid, %outcome, "child terminated");
                Ok(LaunchReport { child_pid, outcome })
            }
            ForkOutcome::Child => child::run_child(&self.host, request),
        }
    }
}
