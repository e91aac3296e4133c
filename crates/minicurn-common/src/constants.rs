//! System-wide constants and default values.

/// Hostname given to the jail when none is configured.
pub const DEFAULT_HOSTNAME: &str = "container";

/// Root filesystem bundle used when none is configured, relative to the
/// launcher's working directory.
pub const DEFAULT_ROOTFS: &str = "../ubuntu-fs";

/// Mount point of the process-information filesystem inside the jail.
pub const PROC_MOUNT_POINT: &str = "/proc";

/// Filesystem type passed to `mount(2)` for the jail's `/proc`.
pub const PROC_FS_TYPE: &str = "proc";

/// Longest hostname accepted by `sethostname(2)` (`HOST_NAME_MAX`).
pub const HOSTNAME_MAX_LEN: usize = 64;

/// Namespace entries under `/proc/self/ns` the launcher relies on.
pub const REQUIRED_NAMESPACES: [&str; 3] = ["pid", "uts", "mnt"];

/// Exit status of any process that aborts a launch.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Environment variable overriding the root filesystem bundle.
pub const ENV_ROOTFS: &str = "MINICURN_ROOTFS";

/// Environment variable overriding the jail hostname.
pub const ENV_HOSTNAME: &str = "MINICURN_HOSTNAME";

/// Environment variable pointing at a JSON launch configuration file.
pub const ENV_CONFIG: &str = "MINICURN_CONFIG";

/// Application name used in CLI output.
pub const APP_NAME: &str = "minicurn";
