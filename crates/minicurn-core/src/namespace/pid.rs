//! PID namespace isolation.
//!
//! Provides the jailed command with its own process ID space, where it runs
//! as PID 1.

use minicurn_common::error::{MinicurnError, Result};

/// Creates a new PID namespace for the children of the calling process.
///
/// The caller itself keeps its PID. After a successful call, the next
/// `fork(2)` child sees itself as PID 1 inside the new namespace.
///
/// # Errors
///
/// Returns [`MinicurnError::PidNamespace`] if `unshare(CLONE_NEWPID)` fails.
#[cfg(target_os = "linux")]
pub fn create_pid_namespace() -> Result<()> {
    use minicurn_common::types::NamespaceSet;
    use nix::sched::unshare;

    unshare(super::clone_flags(&NamespaceSet::PARENT_STAGE))
        .map_err(|e| MinicurnError::PidNamespace { source: e.into() })?;
    tracing::debug!("PID namespace created for future children");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: PID namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_pid_namespace() -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "PID namespace creation",
    })
}
