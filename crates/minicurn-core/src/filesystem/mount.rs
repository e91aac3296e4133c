//! Mount utilities for jail setup.
//!
//! Handles root mount propagation, bind mounts into the bundle, and the
//! `/proc` mount inside the jail's namespaces.

use std::path::Path;

use minicurn_common::config::BindMount;
use minicurn_common::error::{MinicurnError, Result};

/// Recursively marks `/` and every submount as private.
///
/// Mount and unmount events stop propagating between the caller's mount
/// namespace and the host's in both directions. Must run after the mount
/// namespace is unshared and before any mount the host must not see.
///
/// # Errors
///
/// Returns [`MinicurnError::MountPropagation`] if the remount fails.
#[cfg(target_os = "linux")]
pub fn make_root_private() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount::<str, Path, str, str>(
        None,
        Path::new("/"),
        None,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None,
    )
    .map_err(|e| MinicurnError::MountPropagation { source: e.into() })?;
    tracing::debug!("root mount is now private and recursive");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mount propagation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn make_root_private() -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "mount propagation change",
    })
}

/// Binds `volume.source` onto its mount point inside `rootfs`.
///
/// Runs before `chroot(2)`, while the host path is still reachable. The
/// mount point is created inside the bundle if missing: a directory for a
/// directory source, an empty file otherwise. Read-only bindings are
/// remounted with `MS_RDONLY`. Because `/` is already private, the binding
/// stays invisible to the host.
///
/// # Errors
///
/// Returns [`MinicurnError::BindMount`] if the bundle is missing, the mount
/// point cannot be created, or either `mount(2)` call fails.
#[cfg(target_os = "linux")]
pub fn bind_volume(rootfs: &Path, volume: &BindMount) -> Result<()> {
    use std::io;

    use nix::mount::{MsFlags, mount};

    let bind_error = |source: io::Error| MinicurnError::BindMount {
        host_path: volume.source.clone(),
        jail_path: volume.target.clone(),
        source,
    };

    if !rootfs.is_dir() {
        return Err(bind_error(io::Error::new(
            io::ErrorKind::NotFound,
            format!("root filesystem bundle {} is not a directory", rootfs.display()),
        )));
    }

    let target = volume.jail_target(rootfs);
    if volume.source.is_dir() {
        std::fs::create_dir_all(&target).map_err(bind_error)?;
    } else if !target.exists() {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(bind_error)?;
        }
        let _ = std::fs::File::create(&target).map_err(bind_error)?;
    }

    let flags = MsFlags::MS_BIND | MsFlags::MS_REC;
    mount::<Path, Path, str, str>(Some(volume.source.as_path()), &target, None, flags, None)
        .map_err(|e| bind_error(e.into()))?;
    if volume.readonly {
        mount::<str, Path, str, str>(
            None,
            &target,
            None,
            flags | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
            None,
        )
        .map_err(|e| bind_error(e.into()))?;
    }
    tracing::info!(volume = %volume, "bind mount in place");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: bind mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn bind_volume(_rootfs: &Path, _volume: &BindMount) -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "bind mount",
    })
}

/// Mounts a fresh process-information filesystem at `target`.
///
/// Inside a new PID namespace the mount lists only that namespace's
/// processes. `setuid` binaries, device nodes, and execution are disabled
/// on it.
///
/// # Errors
///
/// Returns [`MinicurnError::ProcMount`] if `mount(2)` fails, for instance
/// because `target` does not exist in the bundle.
#[cfg(target_os = "linux")]
pub fn mount_proc(target: &Path) -> Result<()> {
    use minicurn_common::constants::PROC_FS_TYPE;
    use nix::mount::{MsFlags, mount};

    mount::<str, Path, str, str>(
        Some(PROC_FS_TYPE),
        target,
        Some(PROC_FS_TYPE),
        MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC,
        None,
    )
    .map_err(|e| MinicurnError::ProcMount {
        target: target.to_path_buf(),
        source: e.into(),
    })?;
    tracing::debug!(target = %target.display(), "proc mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_target: &Path) -> Result<()> {
    Err(MinicurnError::Unsupported {
        operation: "proc mount",
    })
}
