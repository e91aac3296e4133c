//! Capability bounding for the jailed command.
//!
//! A root process keeps every capability across `execve(2)` unless it is
//! removed from the bounding set first. The capabilities listed here let a
//! process escape or reconfigure the jail, so they are removed before exec.

use minicurn_common::error::Result;

/// Capabilities removed from the bounding and inheritable sets.
#[cfg(target_os = "linux")]
pub const DROPPED_CAPABILITIES: [caps::Capability; 21] = {
    use caps::Capability;
    [
        Capability::CAP_AUDIT_CONTROL,
        Capability::CAP_AUDIT_READ,
        Capability::CAP_AUDIT_WRITE,
        Capability::CAP_BLOCK_SUSPEND,
        Capability::CAP_DAC_READ_SEARCH,
        Capability::CAP_DAC_OVERRIDE,
        Capability::CAP_FSETID,
        Capability::CAP_IPC_LOCK,
        Capability::CAP_MAC_ADMIN,
        Capability::CAP_MAC_OVERRIDE,
        Capability::CAP_MKNOD,
        Capability::CAP_SETFCAP,
        Capability::CAP_SYSLOG,
        Capability::CAP_SYS_ADMIN,
        Capability::CAP_SYS_BOOT,
        Capability::CAP_SYS_MODULE,
        Capability::CAP_SYS_NICE,
        Capability::CAP_SYS_RAWIO,
        Capability::CAP_SYS_RESOURCE,
        Capability::CAP_SYS_TIME,
        Capability::CAP_WAKE_ALARM,
    ]
};

/// Removes [`DROPPED_CAPABILITIES`] from the calling thread's bounding and
/// inheritable sets.
///
/// Capabilities the running kernel does not know are skipped. Requires
/// `CAP_SETPCAP`, so this runs after every step that still needs
/// `CAP_SYS_ADMIN`.
///
/// # Errors
///
/// Returns [`MinicurnError::CapabilityDrop`](minicurn_common::error::MinicurnError::CapabilityDrop)
/// naming the first capability that could not be dropped.
#[cfg(target_os = "linux")]
pub fn drop_capabilities() -> Result<()> {
    use caps::CapSet;
    use minicurn_common::error::MinicurnError;

    let supported = caps::runtime::thread_all_supported();
    let mut dropped = 0_usize;
    for capability in DROPPED_CAPABILITIES
        .into_iter()
        .filter(|capability| supported.contains(capability))
    {
        for set in [CapSet::Bounding, CapSet::Inheritable] {
            caps::drop(None, set, capability).map_err(|e| MinicurnError::CapabilityDrop {
                capability: capability.to_string(),
                source: std::io::Error::other(e),
            })?;
        }
        dropped += 1;
    }
    tracing::debug!(dropped, "capabilities dropped");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: capabilities are a Linux feature.
#[cfg(not(target_os = "linux"))]
pub fn drop_capabilities() -> Result<()> {
    Err(minicurn_common::error::MinicurnError::Unsupported {
        operation: "capability drop",
    })
}
