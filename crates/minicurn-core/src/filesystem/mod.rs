//! Filesystem management for jail isolation.
//!
//! Detaches the jail's mount table from the host, switches the root
//! directory with `chroot(2)`, and mounts the jail's own `/proc`.

pub mod chroot;
pub mod mount;
