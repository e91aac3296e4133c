//! Host checks run before any privileged operation.
//!
//! Hard failures stop the launch while nothing has changed yet. Soft
//! findings are logged and left for the matching gate to report, so a
//! missing bundle still surfaces as a chroot failure.

use std::path::Path;

use minicurn_common::constants::{PROC_MOUNT_POINT, REQUIRED_NAMESPACES};
use minicurn_common::error::{MinicurnError, Result};

const NS_DIR: &str = "/proc/self/ns";
const STATUS_FILE: &str = "/proc/self/status";

/// Runs every preflight check for a launch into `rootfs`.
///
/// # Errors
///
/// Returns [`MinicurnError::Preflight`] if the kernel lacks a required
/// namespace or the process is multi-threaded.
pub fn check_host(rootfs: &Path) -> Result<()> {
    check_namespace_support(Path::new(NS_DIR))?;
    ensure_single_threaded(Path::new(STATUS_FILE))?;

    if !is_privileged() {
        tracing::warn!("not running as root; namespace and mount operations will likely fail");
    }
    for finding in inspect_bundle(rootfs) {
        tracing::warn!(rootfs = %rootfs.display(), "{finding}");
    }
    Ok(())
}

/// Verifies that every namespace the launcher uses is exposed under `ns_dir`.
///
/// # Errors
///
/// Returns [`MinicurnError::Preflight`] naming the first missing namespace.
pub fn check_namespace_support(ns_dir: &Path) -> Result<()> {
    for ns in REQUIRED_NAMESPACES {
        if !ns_dir.join(ns).exists() {
            return Err(MinicurnError::Preflight {
                message: format!("kernel does not support the {ns} namespace"),
            });
        }
    }
    tracing::debug!(namespaces = ?REQUIRED_NAMESPACES, "namespace support confirmed");
    Ok(())
}

/// Verifies from a `/proc/<pid>/status` file that the process has exactly
/// one thread, which `fork(2)` requires to be safe.
///
/// # Errors
///
/// Returns [`MinicurnError::Io`] if the file cannot be read, or
/// [`MinicurnError::Preflight`] if it reports more than one thread or none.
pub fn ensure_single_threaded(status_path: &Path) -> Result<()> {
    let status = std::fs::read_to_string(status_path).map_err(|e| MinicurnError::Io {
        path: status_path.to_path_buf(),
        source: e,
    })?;
    match thread_count(&status) {
        Some(1) => Ok(()),
        Some(n) => Err(MinicurnError::Preflight {
            message: format!("launcher must be single-threaded before fork, found {n} threads"),
        }),
        None => Err(MinicurnError::Preflight {
            message: format!("no thread count in {}", status_path.display()),
        }),
    }
}

/// Extracts the `Threads:` field of a `/proc/<pid>/status` document.
pub fn thread_count(status: &str) -> Option<usize> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Lists problems with the bundle that later gates will trip on.
pub fn inspect_bundle(rootfs: &Path) -> Vec<String> {
    let mut findings = Vec::new();
    if !rootfs.is_dir() {
        findings.push("root filesystem bundle is not a directory".to_string());
        return findings;
    }
    let proc_dir = rootfs.join(PROC_MOUNT_POINT.trim_start_matches('/'));
    if !proc_dir.is_dir() {
        findings.push(format!("bundle has no {PROC_MOUNT_POINT} mount point"));
    }
    findings
}

#[cfg(target_os = "linux")]
fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(target_os = "linux"))]
const fn is_privileged() -> bool {
    false
}
