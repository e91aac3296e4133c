//! Launch configuration model.
//!
//! A [`LaunchConfig`] is the loose, optional-everything view assembled from
//! the command line, environment, and an optional JSON file. It is turned
//! into an immutable, validated [`LaunchRequest`] once, before any privileged
//! operation runs.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HOSTNAME, DEFAULT_ROOTFS, HOSTNAME_MAX_LEN};
use crate::error::{MinicurnError, Result};

/// User-supplied launch settings. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    /// Root filesystem bundle, absolute or relative to the working directory.
    #[serde(default)]
    pub rootfs: Option<PathBuf>,
    /// Hostname inside the jail.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Host directories or files bound into the jail.
    #[serde(default)]
    pub mounts: Vec<BindMount>,
}

impl LaunchConfig {
    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MinicurnError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Layers `overrides` on top of `self`. Scalar fields set in `overrides`
    /// win; bind mounts from both are kept, `self`'s first.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        let mut mounts = self.mounts;
        mounts.extend(overrides.mounts);
        Self {
            rootfs: overrides.rootfs.or(self.rootfs),
            hostname: overrides.hostname.or(self.hostname),
            mounts,
        }
    }

    /// Validates the configuration and binds it to a command.
    ///
    /// Relative bundle and bind-mount source paths are resolved against
    /// `cwd` here, once, so the child never depends on the directory it
    /// happens to run in.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Config`] if the command is empty, an argument
    /// contains a NUL byte, the hostname is empty or too long, or a bind
    /// mount target is not a plain absolute path.
    pub fn into_request(self, command: Vec<String>, cwd: &Path) -> Result<LaunchRequest> {
        let absolute = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        };
        let rootfs = absolute(self.rootfs.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOTFS)));
        let hostname = self
            .hostname
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let mounts = self
            .mounts
            .into_iter()
            .map(|mount| BindMount {
                source: absolute(mount.source),
                ..mount
            })
            .collect();
        LaunchRequest::new(command, hostname, rootfs)?.with_mounts(mounts)
    }
}

/// A host path made visible at a path inside the jail.
///
/// Written `SRC:DST` or `SRC:DST:ro` on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindMount {
    /// Path on the host.
    pub source: PathBuf,
    /// Absolute path as seen from inside the jail.
    pub target: PathBuf,
    /// Remount the binding read-only.
    #[serde(default)]
    pub readonly: bool,
}

impl BindMount {
    /// Where the mount point lives on the host before `chroot(2)`.
    pub fn jail_target(&self, rootfs: &Path) -> PathBuf {
        rootfs.join(self.target.strip_prefix("/").unwrap_or(&self.target))
    }

    fn validate(&self) -> Result<()> {
        if !self.source.is_absolute() {
            return Err(MinicurnError::config(format!(
                "bind mount source must be absolute: {}",
                self.source.display()
            )));
        }
        let plain = self
            .target
            .components()
            .all(|part| matches!(part, Component::RootDir | Component::Normal(_)));
        if !self.target.is_absolute() || !plain || self.target == Path::new("/") {
            return Err(MinicurnError::config(format!(
                "bind mount target must be an absolute path below / without `..`: {}",
                self.target.display()
            )));
        }
        Ok(())
    }
}

impl FromStr for BindMount {
    type Err = MinicurnError;

    fn from_str(value: &str) -> Result<Self> {
        let mut parts = value.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(target), mode, None)
                if !source.is_empty() && !target.is_empty() =>
            {
                let readonly = match mode {
                    None | Some("rw") => false,
                    Some("ro") => true,
                    Some(other) => {
                        return Err(MinicurnError::config(format!(
                            "unknown bind mount mode {other:?}, expected ro or rw"
                        )));
                    }
                };
                Ok(Self {
                    source: PathBuf::from(source),
                    target: PathBuf::from(target),
                    readonly,
                })
            }
            _ => Err(MinicurnError::config(format!(
                "bind mount must be SRC:DST[:ro], got {value:?}"
            ))),
        }
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.target.display())?;
        if self.readonly {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

/// Everything the child needs to build its jail and exec the target.
///
/// Immutable once constructed: fields are private and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    command: Vec<String>,
    hostname: String,
    rootfs: PathBuf,
    mounts: Vec<BindMount>,
}

impl LaunchRequest {
    /// Builds a validated request with no bind mounts.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Config`] on an empty command, an argument
    /// with an interior NUL byte, an invalid hostname, or a relative bundle
    /// path.
    pub fn new(command: Vec<String>, hostname: String, rootfs: PathBuf) -> Result<Self> {
        if command.is_empty() {
            return Err(MinicurnError::config("command must not be empty"));
        }
        if let Some(arg) = command.iter().find(|arg| arg.contains('\0')) {
            return Err(MinicurnError::config(format!(
                "argument contains a NUL byte: {arg:?}"
            )));
        }
        validate_hostname(&hostname)?;
        if !rootfs.is_absolute() {
            return Err(MinicurnError::config(format!(
                "root filesystem path must be absolute: {}",
                rootfs.display()
            )));
        }
        Ok(Self {
            command,
            hostname,
            rootfs,
            mounts: Vec::new(),
        })
    }

    /// Adds bind mounts, applied in order before the jail's root changes.
    ///
    /// # Errors
    ///
    /// Returns [`MinicurnError::Config`] if a source is relative or a target
    /// is relative, is `/`, or contains `..`.
    pub fn with_mounts(mut self, mounts: Vec<BindMount>) -> Result<Self> {
        for mount in &mounts {
            mount.validate()?;
        }
        self.mounts = mounts;
        Ok(self)
    }

    /// Program to execute, looked up through `PATH` inside the jail.
    pub fn program(&self) -> &str {
        &self.command[0]
    }

    /// Full argument vector, program included.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Hostname set inside the jail's UTS namespace.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Absolute path of the root filesystem bundle.
    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Bind mounts, in the order they are applied.
    pub fn mounts(&self) -> &[BindMount] {
        &self.mounts
    }
}

fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(MinicurnError::config("hostname must not be empty"));
    }
    if hostname.len() > HOSTNAME_MAX_LEN {
        return Err(MinicurnError::config(format!(
            "hostname exceeds {HOSTNAME_MAX_LEN} bytes: {hostname}"
        )));
    }
    if hostname.contains('\0') {
        return Err(MinicurnError::config("hostname contains a NUL byte"));
    }
    Ok(())
}
