//! UTS namespace isolation.
//!
//! Lets the jail carry its own hostname without touching the host's.

use minicurn_common::error::{MinicurnError, Result};

/// Sets the hostname inside the caller's UTS namespace.
///
/// Only call this after the UTS namespace has been unshared, otherwise the
/// host's hostname changes.
///
/// # Errors
///
/// Returns [`MinicurnError::Hostname`] if `sethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| MinicurnError::Hostname {
        hostname: hostname.to_string(),
        source: e.into(),
    })?;
    tracing::debug!(hostname, "hostname set");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: UTS namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_hostname(_hostname: &str) -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "hostname change",
    })
}

