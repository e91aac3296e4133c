//! Unified error types for the minicurn workspace.
//!
//! Every variant is fatal. Parent-side variants abort the launcher, child-side
//! variants abort the forked child before it reaches `exec`. None is retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::FAILURE_EXIT_CODE;
use crate::types::ChildStage;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MinicurnError {
    /// The command line is missing required arguments.
    #[error("{message}")]
    Usage {
        /// Diagnostic shown to the user.
        message: String,
    },

    /// A launch configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The host cannot run the launcher.
    #[error("preflight check failed: {message}")]
    Preflight {
        /// Description of the missing host feature.
        message: String,
    },

    /// The operation is not available on this platform.
    #[error("{operation} requires Linux")]
    Unsupported {
        /// Name of the unavailable operation.
        operation: &'static str,
    },

    /// An I/O operation on a launcher-owned file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// `unshare(CLONE_NEWPID)` failed in the launcher.
    #[error("failed to unshare PID namespace: {source}")]
    PidNamespace {
        /// Underlying OS error.
        source: io::Error,
    },

    /// `fork(2)` failed.
    #[error("failed to fork: {source}")]
    Fork {
        /// Underlying OS error.
        source: io::Error,
    },

    /// Waiting for the child failed.
    #[error("failed to wait for child {pid}: {source}")]
    Wait {
        /// PID of the child as seen by the parent.
        pid: i32,
        /// Underlying OS error.
        source: io::Error,
    },

    /// `unshare(CLONE_NEWUTS | CLONE_NEWNS)` failed in the child.
    #[error("failed to unshare UTS and mount namespaces: {source}")]
    Namespace {
        /// Underlying OS error.
        source: io::Error,
    },

    /// Remounting `/` as recursively private failed.
    #[error("failed to make / a private recursive mount: {source}")]
    MountPropagation {
        /// Underlying OS error.
        source: io::Error,
    },

    /// Binding a host path into the bundle failed.
    #[error("failed to bind {host_path} to {jail_path}: {source}")]
    BindMount {
        /// Path on the host.
        host_path: PathBuf,
        /// Mount point as seen from inside the jail.
        jail_path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// `chroot(2)` into the root filesystem bundle failed.
    #[error("failed to chroot into {path}: {source}")]
    Chroot {
        /// Bundle path that could not become the root.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Changing the working directory to the new root failed.
    #[error("failed to change directory to {path}: {source}")]
    Chdir {
        /// Target working directory.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Mounting the jail's process-information filesystem failed.
    #[error("failed to mount proc at {target}: {source}")]
    ProcMount {
        /// Mount point inside the jail.
        target: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// `sethostname(2)` failed.
    #[error("failed to set hostname to {hostname}: {source}")]
    Hostname {
        /// Requested hostname.
        hostname: String,
        /// Underlying OS error.
        source: io::Error,
    },

    /// Removing a capability from the bounding or inheritable set failed.
    #[error("failed to drop capability {capability}: {source}")]
    CapabilityDrop {
        /// Capability name, e.g. `CAP_SYS_ADMIN`.
        capability: String,
        /// Underlying error.
        source: io::Error,
    },

    /// Replacing the process image failed.
    #[error("failed to exec {command}: {source}")]
    Exec {
        /// Program that could not be executed.
        command: String,
        /// Underlying OS error.
        source: io::Error,
    },
}

impl MinicurnError {
    /// Exit status the failing process terminates with.
    pub const fn exit_code(&self) -> i32 {
        FAILURE_EXIT_CODE
    }

    /// Child stage this error prevented the child from reaching, if the error
    /// belongs to the child-side sequence.
    pub const fn failed_stage(&self) -> Option<ChildStage> {
        match self {
            Self::Namespace { .. } => Some(ChildStage::Namespaced),
            Self::MountPropagation { .. } => Some(ChildStage::RootPrivate),
            Self::BindMount { .. } => Some(ChildStage::VolumesBound),
            Self::Chroot { .. } => Some(ChildStage::Chrooted),
            Self::Chdir { .. } => Some(ChildStage::WorkdirSet),
            Self::ProcMount { .. } => Some(ChildStage::ProcMounted),
            Self::Hostname { .. } => Some(ChildStage::HostnameSet),
            Self::CapabilityDrop { .. } => Some(ChildStage::CapabilitiesDropped),
            Self::Exec { .. } => Some(ChildStage::Executed),
            _ => None,
        }
    }

    /// Builds a [`MinicurnError::Usage`] with the given diagnostic.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Builds a [`MinicurnError::Config`] with the given description.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MinicurnError>;
