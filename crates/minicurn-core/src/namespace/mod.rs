//! Linux namespace management for jail isolation.
//!
//! Provides safe wrappers around `unshare(2)` for the namespace types the
//! launcher uses.

pub mod pid;
pub mod uts;

use minicurn_common::error::{MinicurnError, Result};
use minicurn_common::types::NamespaceSet;

/// Translates a [`NamespaceSet`] into `clone(2)` flags.
#[cfg(target_os = "linux")]
pub fn clone_flags(set: &NamespaceSet) -> nix::sched::CloneFlags {
    use nix::sched::CloneFlags;

    let mut flags = CloneFlags::empty();
    if set.pid {
        flags.insert(CloneFlags::CLONE_NEWPID);
    }
    if set.uts {
        flags.insert(CloneFlags::CLONE_NEWUTS);
    }
    if set.mount {
        flags.insert(CloneFlags::CLONE_NEWNS);
    }
    flags
}

/// Moves the calling process into fresh namespaces with one `unshare(2)`.
///
/// The PID namespace only takes effect for children forked afterwards, so
/// callers that need it pass [`NamespaceSet::PARENT_STAGE`] through
/// [`pid::create_pid_namespace`] instead.
///
/// # Errors
///
/// Returns [`MinicurnError::Namespace`] if the set is empty or `unshare(2)`
/// fails.
#[cfg(target_os = "linux")]
pub fn enter_namespaces(set: &NamespaceSet) -> Result<()> {
    use nix::sched::unshare;

    if set.is_empty() {
        return Err(MinicurnError::Namespace {
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty namespace set",
            ),
        });
    }

    unshare(clone_flags(set)).map_err(|e| MinicurnError::Namespace { source: e.into() })?;
    tracing::debug!(namespaces = %set, "namespaces created");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_namespaces(_set: &NamespaceSet) -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "namespace creation",
    })
}
