//! `minicurn run`: jail a command and wait for it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use minicurn_common::config::{BindMount, LaunchConfig};
use minicurn_common::constants::{ENV_CONFIG, ENV_HOSTNAME, ENV_ROOTFS};
use minicurn_runtime::launcher::Launcher;

use crate::output;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program to execute inside the jail, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Root filesystem bundle to chroot into [default: ../ubuntu-fs].
    #[arg(long, env = ENV_ROOTFS, value_name = "DIR")]
    pub rootfs: Option<PathBuf>,

    /// Hostname inside the jail [default: container].
    #[arg(long, env = ENV_HOSTNAME, value_name = "NAME")]
    pub hostname: Option<String>,

    /// Bind a host path into the jail, `SRC:DST` with an optional `:ro`.
    /// Repeatable; applied after any mounts from the configuration file.
    #[arg(long = "mount", value_name = "SRC:DST[:ro]")]
    pub mounts: Vec<BindMount>,

    /// JSON launch configuration file.
    #[arg(long, env = ENV_CONFIG, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Settings given on the command line or through the environment.
    fn overrides(&self) -> LaunchConfig {
        LaunchConfig {
            rootfs: self.rootfs.clone(),
            hostname: self.hostname.clone(),
            mounts: self.mounts.clone(),
        }
    }
}

/// Executes the `run` command.
///
/// Exits with the child's own status when it does not succeed, or 128 plus
/// the signal number when it was killed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the launcher fails
/// before the child exists.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let base = match &args.config {
        Some(path) => LaunchConfig::load(path)
            .with_context(|| format!("cannot load launch configuration {}", path.display()))?,
        None => LaunchConfig::default(),
    };
    let overrides = args.overrides();
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let request = base.merge(overrides).into_request(args.command, &cwd)?;

    tracing::debug!(
        program = request.program(),
        rootfs = %request.rootfs().display(),
        hostname = request.hostname(),
        mounts = request.mounts().len(),
        "launch request ready"
    );

    let report = Launcher::new().launch(&request)?;
    output::report_termination(&report);

    if report.outcome.success() {
        Ok(())
    } else {
        std::process::exit(report.outcome.shell_status())
    }
}
