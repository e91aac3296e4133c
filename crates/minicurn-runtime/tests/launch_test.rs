//! Launch sequence tests driven through a recording host.
//!
//! The host records every privileged operation instead of performing it, so
//! the ordering and short-circuit rules of a launch can be checked without
//! root or a real root filesystem bundle.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};

use minicurn_common::config::{BindMount, LaunchRequest};
use minicurn_common::error::{MinicurnError, Result};
use minicurn_common::types::{ChildStage, ExitOutcome, NamespaceSet};
use minicurn_core::host::Host;
use minicurn_core::process::{ChildHandle, ForkOutcome};
use minicurn_runtime::child::ChildInitializer;
use minicurn_runtime::launcher::Launcher;

const CHILD_PID: i32 = 4242;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Preflight,
    PidNamespace,
    Namespaces,
    RootPrivate,
    Bind,
    Chroot,
    Chdir,
    MountProc,
    Hostname,
    DropCaps,
    Exec,
    Fork,
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Preflight(PathBuf),
    PidNamespace,
    Namespaces(NamespaceSet),
    RootPrivate,
    Bind(PathBuf, BindMount),
    Chroot(PathBuf),
    Chdir,
    MountProc,
    Hostname(String),
    DropCaps,
    Exec(Vec<String>),
    Fork,
    Wait(i32),
}

impl Call {
    const fn op(&self) -> Op {
        match self {
            Self::Preflight(_) => Op::Preflight,
            Self::PidNamespace => Op::PidNamespace,
            Self::Namespaces(_) => Op::Namespaces,
            Self::RootPrivate => Op::RootPrivate,
            Self::Bind(..) => Op::Bind,
            Self::Chroot(_) => Op::Chroot,
            Self::Chdir => Op::Chdir,
            Self::MountProc => Op::MountProc,
            Self::Hostname(_) => Op::Hostname,
            Self::DropCaps => Op::DropCaps,
            Self::Exec(_) => Op::Exec,
            Self::Fork => Op::Fork,
            Self::Wait(_) => Op::Wait,
        }
    }
}

struct RecordingHost {
    calls: RefCell<Vec<Call>>,
    fail_at: Option<Op>,
    outcome: ExitOutcome,
}

impl RecordingHost {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_at: None,
            outcome: ExitOutcome::Exited(0),
        }
    }

    fn failing_at(op: Op) -> Self {
        Self {
            fail_at: Some(op),
            ..Self::new()
        }
    }

    fn exiting_with(outcome: ExitOutcome) -> Self {
        Self {
            outcome,
            ..Self::new()
        }
    }

    fn ops(&self) -> Vec<Op> {
        self.calls.borrow().iter().map(Call::op).collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let op = call.op();
        self.calls.borrow_mut().push(call);
        if self.fail_at == Some(op) {
            return Err(failure_for(op));
        }
        Ok(())
    }
}

fn denied() -> io::Error {
    io::Error::from(io::ErrorKind::PermissionDenied)
}

fn failure_for(op: Op) -> MinicurnError {
    match op {
        Op::Preflight => MinicurnError::Preflight {
            message: "namespace support missing".into(),
        },
        Op::PidNamespace => MinicurnError::PidNamespace { source: denied() },
        Op::Namespaces => MinicurnError::Namespace { source: denied() },
        Op::RootPrivate => MinicurnError::MountPropagation { source: denied() },
        Op::Bind => MinicurnError::BindMount {
            host_path: PathBuf::from("/srv/data"),
            jail_path: PathBuf::from("/data"),
            source: denied(),
        },
        Op::Chroot => MinicurnError::Chroot {
            path: bundle(),
            source: io::Error::from(io::ErrorKind::NotFound),
        },
        Op::Chdir => MinicurnError::Chdir {
            path: PathBuf::from("/"),
            source: denied(),
        },
        Op::MountProc => MinicurnError::ProcMount {
            target: PathBuf::from("/proc"),
            source: denied(),
        },
        Op::Hostname => MinicurnError::Hostname {
            hostname: "container".into(),
            source: denied(),
        },
        Op::DropCaps => MinicurnError::CapabilityDrop {
            capability: "CAP_SYS_ADMIN".into(),
            source: denied(),
        },
        Op::Exec => MinicurnError::Exec {
            command: "/bin/echo".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        },
        Op::Fork => MinicurnError::Fork { source: denied() },
        Op::Wait => MinicurnError::Wait {
            pid: CHILD_PID,
            source: denied(),
        },
    }
}

impl Host for RecordingHost {
    fn preflight(&self, rootfs: &Path) -> Result<()> {
        self.record(Call::Preflight(rootfs.to_path_buf()))
    }

    fn create_pid_namespace(&self) -> Result<()> {
        self.record(Call::PidNamespace)
    }

    fn enter_namespaces(&self, set: NamespaceSet) -> Result<()> {
        self.record(Call::Namespaces(set))
    }

    fn make_root_private(&self) -> Result<()> {
        self.record(Call::RootPrivate)
    }

    fn bind_mount(&self, rootfs: &Path, volume: &BindMount) -> Result<()> {
        self.record(Call::Bind(rootfs.to_path_buf(), volume.clone()))
    }

    fn jail_into(&self, rootfs: &Path) -> Result<()> {
        self.record(Call::Chroot(rootfs.to_path_buf()))
    }

    fn change_dir_to_root(&self) -> Result<()> {
        self.record(Call::Chdir)
    }

    fn mount_proc(&self) -> Result<()> {
        self.record(Call::MountProc)
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        self.record(Call::Hostname(hostname.to_string()))
    }

    fn drop_capabilities(&self) -> Result<()> {
        self.record(Call::DropCaps)
    }

    fn exec(&self, command: &[String]) -> Result<Infallible> {
        self.record(Call::Exec(command.to_vec()))?;
        // A recorded exec never replaces the test process.
        Err(failure_for(Op::Exec))
    }

    fn fork(&self) -> Result<ForkOutcome> {
        self.record(Call::Fork)?;
        Ok(ForkOutcome::Parent(ChildHandle::from_raw(CHILD_PID)))
    }

    fn wait(&self, handle: ChildHandle) -> Result<ExitOutcome> {
        self.record(Call::Wait(handle.pid()))?;
        Ok(self.outcome.clone())
    }
}

fn bundle() -> PathBuf {
    PathBuf::from("/srv/ubuntu-fs")
}

fn request() -> LaunchRequest {
    LaunchRequest::new(
        vec!["/bin/echo".into(), "hello".into()],
        "container".into(),
        bundle(),
    )
    .expect("valid request")
}

fn volume(entry: &str) -> BindMount {
    entry.parse().expect("valid bind mount")
}

fn request_with_volumes(entries: &[&str]) -> LaunchRequest {
    request()
        .with_mounts(entries.iter().copied().map(volume).collect())
        .expect("valid bind mounts")
}

const CHILD_GATES: [Op; 9] = [
    Op::Namespaces,
    Op::RootPrivate,
    Op::Bind,
    Op::Chroot,
    Op::Chdir,
    Op::MountProc,
    Op::Hostname,
    Op::DropCaps,
    Op::Exec,
];

// ── Child sequence ───────────────────────────────────────────────────

#[test]
fn child_runs_gates_in_order_with_request_values() {
    let host = RecordingHost::new();
    let request = request();

    let error = ChildInitializer::new(&host, &request).run();

    assert!(matches!(error, MinicurnError::Exec { .. }));
    assert_eq!(
        *host.calls.borrow(),
        vec![
            Call::Namespaces(NamespaceSet::CHILD_STAGE),
            Call::RootPrivate,
            Call::Chroot(bundle()),
            Call::Chdir,
            Call::MountProc,
            Call::Hostname("container".into()),
            Call::DropCaps,
            Call::Exec(vec!["/bin/echo".into(), "hello".into()]),
        ]
    );
}

#[test]
fn volumes_are_bound_in_order_before_chroot() {
    let host = RecordingHost::new();
    let request = request_with_volumes(&["/srv/data:/data", "/etc/hosts:/etc/hosts:ro"]);

    let _ = ChildInitializer::new(&host, &request).run();

    let calls = host.calls.borrow();
    assert_eq!(
        calls[2..5],
        [
            Call::Bind(bundle(), volume("/srv/data:/data")),
            Call::Bind(bundle(), volume("/etc/hosts:/etc/hosts:ro")),
            Call::Chroot(bundle()),
        ]
    );
}

#[test]
fn failed_bind_stops_remaining_volumes_and_chroot() {
    let host = RecordingHost::failing_at(Op::Bind);
    let request = request_with_volumes(&["/srv/data:/data", "/srv/logs:/logs"]);

    let error = ChildInitializer::new(&host, &request).run();

    assert_eq!(error.failed_stage(), Some(ChildStage::VolumesBound));
    assert_eq!(host.ops(), vec![Op::Namespaces, Op::RootPrivate, Op::Bind]);
}

#[test]
fn capabilities_are_dropped_after_hostname_and_before_exec() {
    let host = RecordingHost::new();
    let request = request();

    let _ = ChildInitializer::new(&host, &request).run();

    let ops = host.ops();
    assert_eq!(ops[ops.len() - 3..], [Op::Hostname, Op::DropCaps, Op::Exec]);
}

#[test]
fn child_never_touches_pid_namespace_or_fork() {
    let host = RecordingHost::new();
    let request = request();

    let _ = ChildInitializer::new(&host, &request).run();

    let ops = host.ops();
    assert!(!ops.contains(&Op::PidNamespace));
    assert!(!ops.contains(&Op::Fork));
    assert!(!ops.contains(&Op::Wait));
}

#[test]
fn missing_bundle_stops_before_proc_hostname_and_exec() {
    let host = RecordingHost::failing_at(Op::Chroot);
    let request = request();

    let error = ChildInitializer::new(&host, &request).run();

    assert_eq!(error.failed_stage(), Some(ChildStage::Chrooted));
    assert!(
        error
            .to_string()
            .starts_with("failed to chroot into /srv/ubuntu-fs")
    );
    assert_eq!(
        host.ops(),
        vec![Op::Namespaces, Op::RootPrivate, Op::Chroot]
    );
}

#[test]
fn failure_at_any_gate_skips_every_later_gate() {
    for (index, gate) in CHILD_GATES.iter().enumerate() {
        let host = RecordingHost::failing_at(*gate);
        let request = request_with_volumes(&["/srv/data:/data"]);

        let error = ChildInitializer::new(&host, &request).run();

        assert_eq!(host.ops(), CHILD_GATES[..=index].to_vec(), "gate {gate:?}");
        assert_eq!(error.exit_code(), 1);
        assert_eq!(
            error.failed_stage(),
            Some(ChildStage::SEQUENCE[index + 1]),
            "gate {gate:?}"
        );
    }
}

#[test]
fn stepping_walks_the_stage_sequence() {
    let host = RecordingHost::new();
    let request = request();
    let mut child = ChildInitializer::new(&host, &request);
    assert_eq!(child.stage(), ChildStage::Forked);

    for expected in &ChildStage::SEQUENCE[1..9] {
        assert_eq!(child.step().unwrap(), *expected);
        assert_eq!(child.stage(), *expected);
    }

    // The recorded exec fails instead of replacing the process.
    assert!(child.step().is_err());
    assert_eq!(child.stage(), ChildStage::Failed);
}

#[test]
fn failed_child_runs_nothing_further() {
    let host = RecordingHost::failing_at(Op::RootPrivate);
    let request = request();
    let mut child = ChildInitializer::new(&host, &request);

    assert_eq!(child.step().unwrap(), ChildStage::Namespaced);
    assert!(child.step().is_err());
    assert_eq!(child.stage(), ChildStage::Failed);

    assert_eq!(child.step().unwrap(), ChildStage::Failed);
    assert_eq!(child.step().unwrap(), ChildStage::Failed);
    assert_eq!(host.ops(), vec![Op::Namespaces, Op::RootPrivate]);
}

// ── Parent sequence ──────────────────────────────────────────────────

#[test]
fn parent_unshares_pid_before_fork_then_waits_once() {
    let launcher = Launcher::with_host(RecordingHost::new());

    let report = launcher.launch(&request()).unwrap();

    assert_eq!(report.child_pid, CHILD_PID);
    assert_eq!(report.outcome, ExitOutcome::Exited(0));
    assert_eq!(
        *launcher.host().calls.borrow(),
        vec![
            Call::Preflight(bundle()),
            Call::PidNamespace,
            Call::Fork,
            Call::Wait(CHILD_PID),
        ]
    );
}

#[test]
fn parent_reports_child_failure_status() {
    let launcher = Launcher::with_host(RecordingHost::exiting_with(ExitOutcome::Exited(1)));

    let report = launcher.launch(&request()).unwrap();

    assert!(!report.outcome.success());
    assert_eq!(report.outcome.shell_status(), 1);
}

#[test]
fn parent_reports_signaled_child() {
    let killed = ExitOutcome::Signaled {
        signal: "SIGKILL".into(),
        number: 9,
        core_dumped: false,
    };
    let launcher = Launcher::with_host(RecordingHost::exiting_with(killed.clone()));

    let report = launcher.launch(&request()).unwrap();

    assert_eq!(report.outcome, killed);
    assert_eq!(report.outcome.shell_status(), 137);
}

#[test]
fn preflight_failure_stops_before_any_namespace() {
    let launcher = Launcher::with_host(RecordingHost::failing_at(Op::Preflight));

    let error = launcher.launch(&request()).unwrap_err();

    assert!(matches!(error, MinicurnError::Preflight { .. }));
    assert_eq!(launcher.host().ops(), vec![Op::Preflight]);
}

#[test]
fn pid_namespace_failure_means_no_fork() {
    let launcher = Launcher::with_host(RecordingHost::failing_at(Op::PidNamespace));

    let error = launcher.launch(&request()).unwrap_err();

    assert!(matches!(error, MinicurnError::PidNamespace { .. }));
    assert_eq!(launcher.host().ops(), vec![Op::Preflight, Op::PidNamespace]);
}

#[test]
fn fork_failure_means_no_wait() {
    let launcher = Launcher::with_host(RecordingHost::failing_at(Op::Fork));

    let error = launcher.launch(&request()).unwrap_err();

    assert!(matches!(error, MinicurnError::Fork { .. }));
    assert!(!launcher.host().ops().contains(&Op::Wait));
}

#[test]
fn wait_failure_is_propagated() {
    let launcher = Launcher::with_host(RecordingHost::failing_at(Op::Wait));

    let error = launcher.launch(&request()).unwrap_err();

    assert!(matches!(error, MinicurnError::Wait { pid: CHILD_PID, .. }));
    assert_eq!(error.exit_code(), 1);
}
