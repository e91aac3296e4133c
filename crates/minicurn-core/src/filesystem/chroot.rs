//! Root directory switching via `chroot(2)`.
//!
//! `chroot` only changes the process's view of `/`. Paired with a private
//! mount namespace and a working directory inside the new root, `..`
//! traversal from `/` resolves back to `/`.

use std::path::Path;

use minicurn_common::error::{MinicurnError, Result};

/// Makes `rootfs` the root directory of the calling process.
///
/// The working directory still points into the old root afterwards; call
/// [`change_dir_to_root`] immediately after.
///
/// # Errors
///
/// Returns [`MinicurnError::Chroot`] if `chroot(2)` fails, including when
/// the bundle does not exist.
#[cfg(target_os = "linux")]
pub fn jail_into(rootfs: &Path) -> Result<()> {
    nix::unistd::chroot(rootfs).map_err(|e| MinicurnError::Chroot {
        path: rootfs.to_path_buf(),
        source: e.into(),
    })?;
    tracing::info!(rootfs = %rootfs.display(), "chroot into bundle");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: the jail requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn jail_into(_rootfs: &Path) -> Result<()> {
    Err(MinicurnError::Unsupported { operation: "chroot" })
}

/// Moves the working directory to `/` of the current root.
///
/// # Errors
///
/// Returns [`MinicurnError::Chdir`] if `chdir(2)` fails.
pub fn change_dir_to_root() -> Result<()> {
    let root = Path::new("/");
    std::env::set_current_dir(root).map_err(|e| MinicurnError::Chdir {
        path: root.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
