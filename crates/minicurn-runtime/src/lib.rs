//! Launch orchestration for the minicurn jail.
//!
//! [`launcher::Launcher`] is the parent side: it creates the PID namespace,
//! forks, and waits. [`child::ChildInitializer`] is the child side: it walks
//! the ordered jail setup and replaces itself with the target command.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod child;
pub mod launcher;
