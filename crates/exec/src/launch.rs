// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol launcher.
//!
//! Hands whole protocols to the operating system: a runner process per
//! launch (job id = pid), or a queue submission when the protocol asks for
//! one. `schedule` starts the same runner in polling mode so it launches
//! itself once its inputs exist.

use crate::error::ExecError;
use crate::hosts::HostConfig;
use crate::shell::{Shell, SystemShell};
use lw_core::{Protocol, UNKNOWN_JOBID};
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

/// What a launcher hands back for a started protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchResult {
    /// Opaque job id; [`UNKNOWN_JOBID`] when the launcher could not tell
    pub job_id: String,
    /// Local process id, 0 when not applicable (queue submissions)
    pub pid: u32,
}

/// Starts, schedules, and stops protocol runs.
pub trait Launcher: Send + Sync {
    /// Start the protocol now. With `wait`, block until the run exits.
    fn launch(
        &self,
        protocol: &Protocol,
        host: &HostConfig,
        project_root: &Path,
        wait: bool,
    ) -> Result<LaunchResult, ExecError>;

    /// Start the protocol in polling mode: the runner waits until the
    /// protocol's inputs are available, re-checking every
    /// `initial_sleep` at first.
    fn schedule(
        &self,
        protocol: &Protocol,
        host: &HostConfig,
        project_root: &Path,
        initial_sleep: Duration,
    ) -> Result<LaunchResult, ExecError>;

    /// Stop a running protocol (queue cancel or signal).
    fn stop(&self, protocol: &Protocol, host: &HostConfig) -> Result<(), ExecError>;
}

/// Launches protocol runner processes (or queue submissions wrapping them).
pub struct ProcessLauncher {
    /// Runner executable and leading arguments; the project root, the
    /// run's store path, and the protocol id are appended per launch.
    runner_command: Vec<String>,
    shell: Arc<dyn Shell>,
}

impl ProcessLauncher {
    pub fn new(runner_command: Vec<String>) -> Self {
        Self {
            runner_command,
            shell: Arc::new(SystemShell),
        }
    }

    pub fn with_shell(runner_command: Vec<String>, shell: Arc<dyn Shell>) -> Self {
        Self { runner_command, shell }
    }

    fn runner_args(&self, protocol: &Protocol, project_root: &Path) -> Vec<String> {
        let mut args: Vec<String> = self.runner_command.iter().skip(1).cloned().collect();
        args.push(project_root.display().to_string());
        args.push(project_root.join(protocol.local_db_path()).display().to_string());
        args.push(protocol.id.to_string());
        args
    }

    fn spawn(
        &self,
        protocol: &Protocol,
        project_root: &Path,
        extra_args: &[String],
        wait: bool,
    ) -> Result<LaunchResult, ExecError> {
        let Some(program) = self.runner_command.first() else {
            return Err(ExecError::LaunchFailed("no runner command configured".to_string()));
        };
        let mut command = Command::new(program);
        command
            .args(self.runner_args(protocol, project_root))
            .args(extra_args)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| ExecError::LaunchFailed(format!("cannot spawn {program:?}: {e}")))?;
        let pid = child.id();
        tracing::info!(protocol = %protocol.id, pid, "runner process started");

        if wait {
            let status = child
                .wait()
                .map_err(|e| ExecError::LaunchFailed(format!("wait failed: {e}")))?;
            tracing::info!(protocol = %protocol.id, code = status.code(), "runner process exited");
        }
        Ok(LaunchResult { job_id: pid.to_string(), pid })
    }

    fn submit_to_queue(
        &self,
        protocol: &Protocol,
        host: &HostConfig,
        project_root: &Path,
        extra_args: &[String],
    ) -> Result<LaunchResult, ExecError> {
        let Some(program) = self.runner_command.first() else {
            return Err(ExecError::LaunchFailed("no runner command configured".to_string()));
        };
        let mut runner = vec![program.clone()];
        runner.extend(self.runner_args(protocol, project_root));
        runner.extend(extra_args.iter().cloned());

        let mut submit = host.queues_default.clone();
        submit.extend(protocol.queue_params.clone());
        submit.insert("JOB_COMMAND".to_string(), runner.join(" "));
        let job_name = format!("{:06}_{}", protocol.id.0, protocol.class_name);
        let script_path = project_root
            .join(&protocol.working_dir)
            .join(format!("{job_name}.job"));
        submit.insert("JOB_NAME".to_string(), job_name);
        submit.insert("JOB_SCRIPT".to_string(), script_path.display().to_string());

        if let Some(parent) = script_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&script_path, HostConfig::render(&host.submit_template, &submit))?;

        let submit_command = HostConfig::render(&host.submit_command, &submit);
        let output = self.shell.run(&submit_command, project_root)?;
        if !output.success() {
            return Err(ExecError::LaunchFailed(format!(
                "queue submission exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }
        let job_id = output.stdout.trim().to_string();
        let job_id = if job_id.is_empty() { UNKNOWN_JOBID.to_string() } else { job_id };
        Ok(LaunchResult { job_id, pid: 0 })
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        protocol: &Protocol,
        host: &HostConfig,
        project_root: &Path,
        wait: bool,
    ) -> Result<LaunchResult, ExecError> {
        if protocol.use_queue {
            self.submit_to_queue(protocol, host, project_root, &[])
        } else {
            self.spawn(protocol, project_root, &[], wait)
        }
    }

    fn schedule(
        &self,
        protocol: &Protocol,
        host: &HostConfig,
        project_root: &Path,
        initial_sleep: Duration,
    ) -> Result<LaunchResult, ExecError> {
        let extra = vec![
            "--schedule".to_string(),
            format!("--sleep={}", initial_sleep.as_secs()),
        ];
        if protocol.use_queue {
            self.submit_to_queue(protocol, host, project_root, &extra)
        } else {
            self.spawn(protocol, project_root, &extra, false)
        }
    }

    fn stop(&self, protocol: &Protocol, host: &HostConfig) -> Result<(), ExecError> {
        if protocol.use_queue {
            if let Some(job_id) = &protocol.job_id {
                let vars = HashMap::from([("JOB_ID".to_string(), job_id.clone())]);
                let command = HostConfig::render(&host.cancel_command, &vars);
                self.shell.run(&command, Path::new("."))?;
            }
            return Ok(());
        }
        if protocol.pid != 0 {
            if let Ok(pid) = i32::try_from(protocol.pid) {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(pid),
                    nix::sys::signal::Signal::SIGTERM,
                );
            }
        }
        Ok(())
    }
}

/// Scripted launcher for scheduler tests: records every call and hands
/// out deterministic job ids.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeLauncher {
    calls: parking_lot::Mutex<Vec<FakeLaunchCall>>,
    fail_next: parking_lot::Mutex<bool>,
    next_pid: parking_lot::Mutex<u32>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeLaunchCall {
    Launch { protocol: lw_core::ObjId, wait: bool },
    Schedule { protocol: lw_core::ObjId, initial_sleep: Duration },
    Stop { protocol: lw_core::ObjId },
}

#[cfg(any(test, feature = "test-support"))]
impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            fail_next: parking_lot::Mutex::new(false),
            next_pid: parking_lot::Mutex::new(41000),
        }
    }

    /// Make the next launch/schedule return [`UNKNOWN_JOBID`].
    pub fn fail_next(&self) {
        *self.fail_next.lock() = true;
    }

    pub fn calls(&self) -> Vec<FakeLaunchCall> {
        self.calls.lock().clone()
    }

    fn result(&self) -> LaunchResult {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return LaunchResult { job_id: UNKNOWN_JOBID.to_string(), pid: 0 };
        }
        let mut pid = self.next_pid.lock();
        *pid += 1;
        LaunchResult { job_id: pid.to_string(), pid: *pid }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Launcher for FakeLauncher {
    fn launch(
        &self,
        protocol: &Protocol,
        _host: &HostConfig,
        _project_root: &Path,
        wait: bool,
    ) -> Result<LaunchResult, ExecError> {
        self.calls.lock().push(FakeLaunchCall::Launch { protocol: protocol.id, wait });
        Ok(self.result())
    }

    fn schedule(
        &self,
        protocol: &Protocol,
        _host: &HostConfig,
        _project_root: &Path,
        initial_sleep: Duration,
    ) -> Result<LaunchResult, ExecError> {
        self.calls
            .lock()
            .push(FakeLaunchCall::Schedule { protocol: protocol.id, initial_sleep });
        Ok(self.result())
    }

    fn stop(&self, protocol: &Protocol, _host: &HostConfig) -> Result<(), ExecError> {
        self.calls.lock().push(FakeLaunchCall::Stop { protocol: protocol.id });
        Ok(())
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
