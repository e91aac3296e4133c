//! Child-side jail construction.
//!
//! Runs in the forked child only. Every step is a gate: the first failure
//! moves the machine to [`ChildStage::Failed`] and no later step runs.

use minicurn_common::config::LaunchRequest;
use minicurn_common::error::{MinicurnError, Result};
use minicurn_common::types::{ChildStage, NamespaceSet};
use minicurn_core::host::Host;

/// Ordered state machine turning a freshly forked process into the jailed
/// target command.
pub struct ChildInitializer<'a, H: Host> {
    host: &'a H,
    request: &'a LaunchRequest,
    stage: ChildStage,
}

impl<'a, H: Host> ChildInitializer<'a, H> {
    /// Starts a machine in [`ChildStage::Forked`].
    pub const fn new(host: &'a H, request: &'a LaunchRequest) -> Self {
        Self {
            host,
            request,
            stage: ChildStage::Forked,
        }
    }

    /// Current stage.
    pub const fn stage(&self) -> ChildStage {
        self.stage
    }

    /// Performs the single operation leading out of the current stage.
    ///
    /// Returns the stage reached. Terminal stages are left untouched and
    /// run nothing.
    ///
    /// # Errors
    ///
    /// Returns the failing operation's error after moving to
    /// [`ChildStage::Failed`].
    pub fn step(&mut self) -> Result<ChildStage> {
        let Some(next) = self.stage.next() else {
            return Ok(self.stage);
        };

        if let Err(error) = self.run_gate() {
            tracing::debug!(from = %self.stage, to = %next, "gate failed");
            self.stage = ChildStage::Failed;
            return Err(error);
        }

        tracing::debug!(stage = %next, "gate passed");
        self.stage = next;
        Ok(next)
    }

    /// Drives the machine until a gate fails.
    ///
    /// On success the final gate replaces the process image, so this only
    /// ever returns the error that stopped the sequence.
    pub fn run(mut self) -> MinicurnError {
        loop {
            if let Err(error) = self.step() {
                return error;
            }
        }
    }

    fn run_gate(&self) -> Result<()> {
        let host = self.host;
        match self.stage {
            ChildStage::Forked => host.enter_namespaces(NamespaceSet::CHILD_STAGE),
            ChildStage::Namespaced => host.make_root_private(),
            ChildStage::RootPrivate => self
                .request
                .mounts()
                .iter()
                .try_for_each(|volume| host.bind_mount(self.request.rootfs(), volume)),
            ChildStage::VolumesBound => host.jail_into(self.request.rootfs()),
            ChildStage::Chrooted => host.change_dir_to_root(),
            ChildStage::WorkdirSet => host.mount_proc(),
            ChildStage::ProcMounted => host.set_hostname(self.request.hostname()),
            ChildStage::HostnameSet => host.drop_capabilities(),
            ChildStage::CapabilitiesDropped => match host.exec(self.request.command()) {
                Ok(never) => match never {},
                Err(error) => Err(error),
            },
            ChildStage::Executed | ChildStage::Failed => Ok(()),
        }
    }
}

/// Entry point of the forked child. Never returns to the caller.
///
/// Builds the jail and execs the target command. If any gate fails, logs
/// the diagnostic and exits with status 1 without running later steps.
pub fn run_child<H: Host>(host: &H, request: &LaunchRequest) -> ! {
    tracing::info!(
        command = ?request.command(),
        pid = std::process::id(),
        "child running"
    );

    let error = ChildInitializer::new(host, request).run();
    match error.failed_stage() {
        Some(stage) => tracing::error!(%stage, "{error}"),
        None => tracing::error!("{error}"),
    }
    std::process::exit(error.exit_code())
}
