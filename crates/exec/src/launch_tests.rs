// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::shell::FakeShell;
use lw_core::{ObjId, Protocol};
use std::path::PathBuf;
use tempfile::tempdir;

fn protocol(id: u64) -> Protocol {
    Protocol::builder()
        .id(ObjId(id))
        .working_dir(PathBuf::from(format!("Runs/{id:06}_ProtAlign")))
        .build()
}

#[test]
fn fake_launcher_records_calls_in_order() {
    let launcher = FakeLauncher::new();
    let host = HostConfig::default();
    let prot = protocol(3);

    let result = launcher.launch(&prot, &host, Path::new("/p"), false).unwrap();
    assert_ne!(result.job_id, UNKNOWN_JOBID);
    assert_ne!(result.pid, 0);

    launcher
        .schedule(&prot, &host, Path::new("/p"), Duration::from_secs(4))
        .unwrap();
    launcher.stop(&prot, &host).unwrap();

    assert_eq!(
        launcher.calls(),
        vec![
            FakeLaunchCall::Launch { protocol: ObjId(3), wait: false },
            FakeLaunchCall::Schedule {
                protocol: ObjId(3),
                initial_sleep: Duration::from_secs(4)
            },
            FakeLaunchCall::Stop { protocol: ObjId(3) },
        ]
    );
}

#[test]
fn fake_launcher_fail_next_returns_unknown_jobid() {
    let launcher = FakeLauncher::new();
    launcher.fail_next();
    let result = launcher
        .launch(&protocol(1), &HostConfig::default(), Path::new("/p"), false)
        .unwrap();
    assert_eq!(result.job_id, UNKNOWN_JOBID);

    // Only the next call fails
    let result = launcher
        .launch(&protocol(1), &HostConfig::default(), Path::new("/p"), false)
        .unwrap();
    assert_ne!(result.job_id, UNKNOWN_JOBID);
}

#[test]
fn queue_launch_submits_script_with_runner_command() {
    let dir = tempdir().unwrap();
    let shell = Arc::new(FakeShell::new());
    shell.push_output("queue-77\n");

    let launcher = ProcessLauncher::with_shell(
        vec!["lw-runner".to_string()],
        Arc::clone(&shell) as Arc<dyn Shell>,
    );
    let host = HostConfig {
        submit_command: "sbatch %(JOB_SCRIPT)s".to_string(),
        submit_template: "#!/bin/sh\n%(JOB_COMMAND)s\n".to_string(),
        ..HostConfig::default()
    };
    let mut prot = protocol(12);
    prot.use_queue = true;

    let result = launcher.launch(&prot, &host, dir.path(), false).unwrap();
    assert_eq!(result.job_id, "queue-77");
    assert_eq!(result.pid, 0);

    let script_path = dir
        .path()
        .join("Runs/000012_ProtAlign/000012_ProtAlign.job");
    let script = std::fs::read_to_string(script_path).unwrap();
    assert!(script.contains("lw-runner"));
    assert!(script.contains("run.db"));
    assert!(script.contains(" 12"));
}

#[test]
fn queue_launch_empty_output_is_unknown_jobid() {
    let dir = tempdir().unwrap();
    let shell = Arc::new(FakeShell::new());
    shell.push_output("");

    let launcher =
        ProcessLauncher::with_shell(vec!["lw-runner".to_string()], shell as Arc<dyn Shell>);
    let host = HostConfig {
        submit_command: "sbatch %(JOB_SCRIPT)s".to_string(),
        ..HostConfig::default()
    };
    let mut prot = protocol(12);
    prot.use_queue = true;

    let result = launcher.launch(&prot, &host, dir.path(), false).unwrap();
    assert_eq!(result.job_id, UNKNOWN_JOBID);
}

#[test]
fn spawn_launch_returns_pid_as_job_id() {
    let dir = tempdir().unwrap();
    let launcher = ProcessLauncher::new(vec!["true".to_string()]);
    let prot = protocol(1);

    let result = launcher
        .launch(&prot, &HostConfig::default(), dir.path(), true)
        .unwrap();
    assert_eq!(result.job_id, result.pid.to_string());
    assert_ne!(result.pid, 0);
}

#[test]
fn empty_runner_command_cannot_launch() {
    let dir = tempdir().unwrap();
    let launcher = ProcessLauncher::new(vec![]);
    let err = launcher
        .launch(&protocol(1), &HostConfig::default(), dir.path(), false)
        .unwrap_err();
    assert!(matches!(err, ExecError::LaunchFailed(_)));
}
