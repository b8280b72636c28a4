// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue-submitting job runner.
//!
//! Each `run_job` call becomes one batch submission: the command is
//! wrapped in a generated script, submitted through the host's submit
//! template, then polled until the queue reports it done. Poll intervals
//! start at 3 s and back off by 3 s per poll up to 300 s.

use crate::error::ExecError;
use crate::hosts::HostConfig;
use crate::shell::{Shell, SystemShell};
use crate::step::{JobRunner, StepContext};
use lw_core::UNKNOWN_JOBID;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const POLL_START_SECS: u64 = 3;
pub const POLL_INCREMENT_SECS: u64 = 3;
pub const POLL_MAX_SECS: u64 = 300;

/// Next poll interval: +3 s per poll, capped at 300 s, never shrinking.
pub fn next_poll_wait(wait: Duration) -> Duration {
    (wait + Duration::from_secs(POLL_INCREMENT_SECS)).min(Duration::from_secs(POLL_MAX_SECS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueuePoll {
    Finished,
    Running,
}

/// Turns job commands into queue submissions.
pub struct QueueRunner {
    host: Arc<HostConfig>,
    /// Per-protocol submission parameters, layered over the host defaults
    submit_params: HashMap<String, String>,
    job_name: String,
    scripts_dir: PathBuf,
    shell: Arc<dyn Shell>,
    done_regex: Option<Regex>,
    poll_start: Duration,
}

impl QueueRunner {
    pub fn new(
        host: Arc<HostConfig>,
        submit_params: HashMap<String, String>,
        job_name: impl Into<String>,
        scripts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::with_shell(host, submit_params, job_name, scripts_dir, Arc::new(SystemShell))
    }

    pub fn with_shell(
        host: Arc<HostConfig>,
        submit_params: HashMap<String, String>,
        job_name: impl Into<String>,
        scripts_dir: impl Into<PathBuf>,
        shell: Arc<dyn Shell>,
    ) -> Self {
        let done_regex = host.job_done_regex.as_deref().and_then(|src| {
            Regex::new(src)
                .map_err(|e| {
                    tracing::warn!(regex = src, error = %e, "invalid job done regex, ignoring");
                })
                .ok()
        });
        Self {
            host,
            submit_params,
            job_name: job_name.into(),
            scripts_dir: scripts_dir.into(),
            shell,
            done_regex,
            poll_start: Duration::from_secs(POLL_START_SECS),
        }
    }

    /// Override the first poll interval (tests).
    pub fn poll_start(mut self, wait: Duration) -> Self {
        self.poll_start = wait;
        self
    }

    fn check_status(&self, job_id: &str, cwd: &Path) -> Result<QueuePoll, ExecError> {
        let vars = HashMap::from([("JOB_ID".to_string(), job_id.to_string())]);
        let command = HostConfig::render(&self.host.check_command, &vars);
        let output = self.shell.run(&command, cwd)?;
        let text = output.stdout.trim();

        // Nothing returned: the job left the queue, assume finished
        if text.is_empty() {
            return Ok(QueuePoll::Finished);
        }
        match &self.done_regex {
            Some(re) if re.is_match(text) => Ok(QueuePoll::Finished),
            // Without a regex, any non-empty output means still running
            _ => Ok(QueuePoll::Running),
        }
    }

    fn submit(&self, ctx: &StepContext, command: &str) -> Result<String, ExecError> {
        let sub_id = ctx.next_sub_id();
        let mut submit = self.host.queues_default.clone();
        submit.extend(self.submit_params.clone());
        submit.insert("JOB_COMMAND".to_string(), command.to_string());

        let job_name = format!("{}-{}", self.job_name, sub_id);
        let script_path = self.scripts_dir.join(format!("{job_name}.job"));
        submit.insert("JOB_NAME".to_string(), job_name.clone());
        submit.insert("JOB_SCRIPT".to_string(), script_path.display().to_string());
        submit.insert(
            "JOB_LOGS".to_string(),
            self.scripts_dir.join(&job_name).display().to_string(),
        );

        std::fs::create_dir_all(&self.scripts_dir)?;
        std::fs::write(&script_path, HostConfig::render(&self.host.submit_template, &submit))?;

        let submit_command = HostConfig::render(&self.host.submit_command, &submit);
        let output = self.shell.run(&submit_command, &ctx.cwd)?;
        if !output.success() {
            return Err(ExecError::QueueSubmitFailed(format!(
                "{submit_command:?} exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }
        let job_id = output.stdout.trim().to_string();
        if job_id.is_empty() || job_id == UNKNOWN_JOBID {
            return Err(ExecError::QueueSubmitFailed(
                "queue returned no job id".to_string(),
            ));
        }
        Ok(job_id)
    }
}

impl JobRunner for QueueRunner {
    fn run_job(&self, ctx: &mut StepContext, command: &str) -> Result<i32, ExecError> {
        let job_id = self.submit(ctx, command)?;
        tracing::info!(host = %self.host.name, job_id = %job_id, "submitted job to queue");

        let mut wait = self.poll_start;
        while self.check_status(&job_id, &ctx.cwd)? == QueuePoll::Running {
            std::thread::sleep(wait);
            wait = next_poll_wait(wait);
        }
        Ok(0)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
