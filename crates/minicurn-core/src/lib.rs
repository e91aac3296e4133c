//! # minicurn-core
//!
//! Low-level Linux isolation primitives for the minicurn launcher.
//!
//! This crate provides safe wrappers over:
//! - **Namespaces**: PID, UTS, and mount isolation via `unshare(2)`.
//! - **Filesystem**: mount propagation, bind mounts, `chroot(2)`, and the
//!   jail's `/proc`.
//! - **Capabilities**: bounding-set reduction before exec.
//! - **Process control**: `fork(2)`, `waitpid(2)`, and `execvp(3)`.
//!
//! The [`host::Host`] trait gathers every privileged operation behind one
//! narrow boundary so the launch sequence can be driven against a mock.
//! Each wrapper maps its failure to the matching
//! [`MinicurnError`](minicurn_common::error::MinicurnError) variant.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod capability;
pub mod filesystem;
pub mod host;
pub mod namespace;
pub mod preflight;
pub mod process;
