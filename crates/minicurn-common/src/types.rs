//! Domain primitive types used across the minicurn workspace.

use std::fmt;

/// Set of namespaces to create with a single `unshare(2)` call.
///
/// The launcher applies it in two stages: the PID namespace before fork,
/// so only the forked child is renumbered, and UTS plus mount namespaces
/// inside the child after fork.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NamespaceSet {
    /// Isolate the PID namespace.
    pub pid: bool,
    /// Isolate the UTS (hostname) namespace.
    pub uts: bool,
    /// Isolate the mount namespace.
    pub mount: bool,
}

impl NamespaceSet {
    /// No namespace at all.
    pub const EMPTY: Self = Self {
        pid: false,
        uts: false,
        mount: false,
    };

    /// Stage applied by the orchestrator before fork, so only the next
    /// forked child is renumbered.
    pub const PARENT_STAGE: Self = Self {
        pid: true,
        uts: false,
        mount: false,
    };

    /// Stage applied by the child right after fork.
    pub const CHILD_STAGE: Self = Self {
        pid: false,
        uts: true,
        mount: true,
    };

    /// Returns `true` if no namespace is selected.
    pub const fn is_empty(&self) -> bool {
        !(self.pid || self.uts || self.mount)
    }
}

impl fmt::Display for NamespaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = [(self.pid, "pid"), (self.uts, "uts"), (self.mount, "mnt")]
            .into_iter()
            .filter_map(|(enabled, name)| enabled.then_some(name))
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Position of the forked child in its setup sequence.
///
/// Stages are strictly ordered. The child may only move to the stage
/// returned by [`ChildStage::next`], or to [`ChildStage::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildStage {
    /// Fresh out of `fork(2)`, still sharing the host's UTS and mount namespaces.
    Forked,
    /// Owns private UTS and mount namespaces.
    Namespaced,
    /// Root mount is private and recursive, detached from host propagation.
    RootPrivate,
    /// Every requested bind mount is in place inside the bundle.
    VolumesBound,
    /// Root directory points at the bundle.
    Chrooted,
    /// Working directory is `/` inside the bundle.
    WorkdirSet,
    /// `/proc` reflects the child's PID namespace.
    ProcMounted,
    /// Hostname is set inside the UTS namespace.
    HostnameSet,
    /// Dangerous capabilities are gone from the bounding and inheritable sets.
    CapabilitiesDropped,
    /// Process image replaced by the target command.
    Executed,
    /// A gate failed; no later step ran.
    Failed,
}

impl ChildStage {
    /// Stages in the order the child must traverse them.
    pub const SEQUENCE: [Self; 10] = [
        Self::Forked,
        Self::Namespaced,
        Self::RootPrivate,
        Self::VolumesBound,
        Self::Chrooted,
        Self::WorkdirSet,
        Self::ProcMounted,
        Self::HostnameSet,
        Self::CapabilitiesDropped,
        Self::Executed,
    ];

    /// The stage reached by the next successful gate, or `None` when terminal.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Forked => Some(Self::Namespaced),
            Self::Namespaced => Some(Self::RootPrivate),
            Self::RootPrivate => Some(Self::VolumesBound),
            Self::VolumesBound => Some(Self::Chrooted),
            Self::Chrooted => Some(Self::WorkdirSet),
            Self::WorkdirSet => Some(Self::ProcMounted),
            Self::ProcMounted => Some(Self::HostnameSet),
            Self::HostnameSet => Some(Self::CapabilitiesDropped),
            Self::CapabilitiesDropped => Some(Self::Executed),
            Self::Executed | Self::Failed => None,
        }
    }
}

impl fmt::Display for ChildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Forked => "forked",
            Self::Namespaced => "uts-mount-namespaced",
            Self::RootPrivate => "root-private",
            Self::VolumesBound => "volumes-bound",
            Self::Chrooted => "chrooted",
            Self::WorkdirSet => "workdir-set",
            Self::ProcMounted => "proc-mounted",
            Self::HostnameSet => "hostname-set",
            Self::CapabilitiesDropped => "capabilities-dropped",
            Self::Executed => "executed",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// How the child terminated, as observed by the parent's single wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child called `exit` with this status.
    Exited(i32),
    /// The child was killed by a signal.
    Signaled {
        /// Signal name, e.g. `SIGKILL`.
        signal: String,
        /// Signal number.
        number: i32,
        /// Whether a core dump was produced.
        core_dumped: bool,
    },
}

impl ExitOutcome {
    /// Returns `true` if the child exited with status 0.
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit status, if the child exited normally.
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled { .. } => None,
        }
    }

    /// Status a shell would report for this outcome: the exit code, or
    /// 128 plus the signal number.
    pub const fn shell_status(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled { number, .. } => 128 + *number,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Signaled {
                signal,
                core_dumped: true,
                ..
            } => write!(f, "killed by {signal} (core dumped)"),
            Self::Signaled { signal, .. } => write!(f, "killed by {signal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_stages_are_disjoint() {
        let (parent, child) = (NamespaceSet::PARENT_STAGE, NamespaceSet::CHILD_STAGE);
        assert!(parent.pid && !parent.uts && !parent.mount);
        assert!(!child.pid && child.uts && child.mount);
        assert!(!parent.is_empty() && !child.is_empty());
        assert!(NamespaceSet::EMPTY.is_empty());
    }

    #[test]
    fn namespace_set_display() {
        assert_eq!(NamespaceSet::EMPTY.to_string(), "none");
        assert_eq!(NamespaceSet::CHILD_STAGE.to_string(), "uts|mnt");
        assert_eq!(NamespaceSet::PARENT_STAGE.to_string(), "pid");
    }

    #[test]
    fn stage_sequence_follows_next() {
        for pair in ChildStage::SEQUENCE.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(ChildStage::Executed.next(), None);
        assert_eq!(ChildStage::Failed.next(), None);
    }

    #[test]
    fn only_executed_and_failed_are_terminal() {
        let terminal: Vec<_> = ChildStage::SEQUENCE
            .iter()
            .copied()
            .chain([ChildStage::Failed])
            .filter(|stage| stage.next().is_none())
            .collect();
        assert_eq!(terminal, vec![ChildStage::Executed, ChildStage::Failed]);
    }

    #[test]
    fn exit_outcome_success_only_for_zero() {
        assert!(ExitOutcome::Exited(0).success());
        assert!(!ExitOutcome::Exited(1).success());
        let killed = ExitOutcome::Signaled {
            signal: "SIGKILL".into(),
            number: 9,
            core_dumped: false,
        };
        assert!(!killed.success());
        assert_eq!(killed.code(), None);
        assert_eq!(killed.shell_status(), 137);
        assert_eq!(ExitOutcome::Exited(3).shell_status(), 3);
        assert_eq!(killed.to_string(), "killed by SIGKILL");
    }
}
