//! Privileged-operation boundary.
//!
//! Every kernel-state change the launcher performs goes through [`Host`].
//! [`LinuxHost`] forwards to the real syscall wrappers; tests substitute a
//! recording implementation and run the launch sequence without privileges.

use std::convert::Infallible;
use std::path::Path;

use minicurn_common::config::BindMount;
use minicurn_common::constants::PROC_MOUNT_POINT;
use minicurn_common::error::Result;
use minicurn_common::types::{ExitOutcome, NamespaceSet};

use crate::process::{ChildHandle, ForkOutcome};
use crate::{capability, filesystem, namespace, preflight, process};

/// Narrow interface over the privileged operations of a launch.
pub trait Host {
    /// Checks that the host can run a launch into `rootfs`.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Preflight`](minicurn_common::error::MinicurnError::Preflight)
    /// if a launch cannot succeed on this host.
    fn preflight(&self, rootfs: &Path) -> Result<()>;

    /// Creates a PID namespace for the caller's future children.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::PidNamespace`](minicurn_common::error::MinicurnError::PidNamespace)
    /// on failure.
    fn create_pid_namespace(&self) -> Result<()>;

    /// Moves the caller into new namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Namespace`](minicurn_common::error::MinicurnError::Namespace)
    /// on failure.
    fn enter_namespaces(&self, set: NamespaceSet) -> Result<()>;

    /// Detaches the caller's mount table from host propagation.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::MountPropagation`](minicurn_common::error::MinicurnError::MountPropagation)
    /// on failure.
    fn make_root_private(&self) -> Result<()>;

    /// Binds a host path onto its mount point inside `rootfs`.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::BindMount`](minicurn_common::error::MinicurnError::BindMount)
    /// on failure.
    fn bind_mount(&self, rootfs: &Path, volume: &BindMount) -> Result<()>;

    /// Makes `rootfs` the caller's root directory.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Chroot`](minicurn_common::error::MinicurnError::Chroot)
    /// on failure.
    fn jail_into(&self, rootfs: &Path) -> Result<()>;

    /// Moves the working directory to `/` of the current root.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Chdir`](minicurn_common::error::MinicurnError::Chdir)
    /// on failure.
    fn change_dir_to_root(&self) -> Result<()>;

    /// Mounts the jail's process-information filesystem at `/proc`.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::ProcMount`](minicurn_common::error::MinicurnError::ProcMount)
    /// on failure.
    fn mount_proc(&self) -> Result<()>;

    /// Sets the hostname of the caller's UTS namespace.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Hostname`](minicurn_common::error::MinicurnError::Hostname)
    /// on failure.
    fn set_hostname(&self, hostname: &str) -> Result<()>;

    /// Removes jail-breaking capabilities before exec.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::CapabilityDrop`](minicurn_common::error::MinicurnError::CapabilityDrop)
    /// on failure.
    fn drop_capabilities(&self) -> Result<()>;

    /// Replaces the process image. Only returns on failure.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Exec`](minicurn_common::error::MinicurnError::Exec)
    /// on failure.
    fn exec(&self, command: &[String]) -> Result<Infallible>;

    /// Forks the caller.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Fork`](minicurn_common::error::MinicurnError::Fork)
    /// on failure.
    fn fork(&self) -> Result<ForkOutcome>;

    /// Blocks until the child behind `handle` terminates.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Wait`](minicurn_common::error::MinicurnError::Wait)
    /// on failure.
    fn wait(&self, handle: ChildHandle) -> Result<ExitOutcome>;
}

/// [`Host`] backed by the running Linux kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl LinuxHost {
    /// Creates a host bound to the real kernel.
    pub const fn new() -> Self {
        Self
    }
}

impl Host for LinuxHost {
    fn preflight(&self, rootfs: &Path) -> Result<()> {
        preflight::check_host(rootfs)
    }

    fn create_pid_namespace(&self) -> Result<()> {
        namespace::pid::create_pid_namespace()
    }

    fn enter_namespaces(&self, set: NamespaceSet) -> Result<()> {
        namespace::enter_namespaces(&set)
    }

    fn make_root_private(&self) -> Result<()> {
        filesystem::mount::make_root_private()
    }

    fn bind_mount(&self, rootfs: &Path, volume: &BindMount) -> Result<()> {
        filesystem::mount::bind_volume(rootfs, volume)
    }

    fn jail_into(&self, rootfs: &Path) -> Result<()> {
        filesystem::chroot::jail_into(rootfs)
    }

    fn change_dir_to_root(&self) -> Result<()> {
        filesystem::chroot::change_dir_to_root()
    }

    fn mount_proc(&self) -> Result<()> {
        filesystem::mount::mount_proc(Path::new(PROC_MOUNT_POINT))
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        namespace::uts::set_hostname(hostname)
    }

    fn drop_capabilities(&self) -> Result<()> {
        capability::drop_capabilities()
    }

    fn exec(&self, command: &[String]) -> Result<Infallible> {
        process::exec_command(command)
    }

    fn fork(&self) -> Result<ForkOutcome> {
        process::fork_process()
    }

    fn wait(&self, handle: ChildHandle) -> Result<ExitOutcome> {
        process::wait_child(handle)
    }
}
