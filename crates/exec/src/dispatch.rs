// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-dispatch job runner.
//!
//! The coordinator keeps the thread-pool loop but sends each job command
//! to a remote worker rank instead of running it locally. Worker rank
//! `w + 1` serves pool worker `w`; messages are tagged `TAG_RUN_JOB + rank`
//! and replies carry either an exit code or an error string. The sentinel
//! `"None"` terminates worker loops.

use crate::error::ExecError;
use crate::shell::Shell;
use crate::step::{JobRunner, StepContext};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Base message tag; each rank adds its own rank number.
pub const TAG_RUN_JOB: u64 = 1000;

/// Command string telling a worker loop to exit.
pub const TERMINATE_SENTINEL: &str = "None";

/// Point-to-point message transport between the coordinator (rank 0) and
/// worker ranks.
pub trait Comm: Send + Sync {
    fn send(&self, dest: usize, tag: u64, message: &str) -> Result<(), ExecError>;

    /// Non-blocking receive of the next message addressed to `dest` with
    /// the given tag.
    fn try_recv(&self, dest: usize, tag: u64) -> Result<Option<String>, ExecError>;
}

/// In-memory transport: mailboxes keyed by (destination rank, tag).
///
/// Backs the tests and any single-process deployment; a real MPI binding
/// would implement [`Comm`] the same way.
#[derive(Clone, Default)]
pub struct ChannelComm {
    boxes: Arc<Mutex<HashMap<(usize, u64), VecDeque<String>>>>,
}

impl ChannelComm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Comm for ChannelComm {
    fn send(&self, dest: usize, tag: u64, message: &str) -> Result<(), ExecError> {
        self.boxes
            .lock()
            .entry((dest, tag))
            .or_default()
            .push_back(message.to_string());
        Ok(())
    }

    fn try_recv(&self, dest: usize, tag: u64) -> Result<Option<String>, ExecError> {
        Ok(self
            .boxes
            .lock()
            .get_mut(&(dest, tag))
            .and_then(VecDeque::pop_front))
    }
}

/// Sends job commands to remote workers and waits for their replies.
pub struct DispatchRunner {
    comm: Arc<dyn Comm>,
    poll_interval: Duration,
}

impl DispatchRunner {
    pub fn new(comm: Arc<dyn Comm>) -> Self {
        Self {
            comm,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the reply poll interval (tests).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Tell every worker rank `1..=n_workers` to exit its loop. Called by
    /// the coordinator after `run_steps` returns.
    pub fn terminate_workers(&self, n_workers: usize) -> Result<(), ExecError> {
        for rank in 1..=n_workers {
            self.comm.send(rank, TAG_RUN_JOB + rank as u64, TERMINATE_SENTINEL)?;
        }
        Ok(())
    }
}

impl JobRunner for DispatchRunner {
    fn run_job(&self, ctx: &mut StepContext, command: &str) -> Result<i32, ExecError> {
        let rank = ctx.worker_id + 1;
        let tag = TAG_RUN_JOB + rank as u64;
        self.comm.send(rank, tag, command)?;

        // Block on the matching reply addressed back to the coordinator
        let reply = loop {
            if let Some(reply) = self.comm.try_recv(0, tag)? {
                break reply;
            }
            std::thread::sleep(self.poll_interval);
        };

        match reply.parse::<i32>() {
            Ok(code) => Ok(code),
            Err(_) => Err(ExecError::StepFailed(reply)),
        }
    }
}

/// Worker-side loop for rank `rank`: receive commands until the sentinel
/// arrives, run each through the shell, and send back the exit code on
/// success or the error text on failure.
pub fn worker_loop(
    comm: &dyn Comm,
    rank: usize,
    shell: &dyn Shell,
    cwd: &Path,
    poll_interval: Duration,
) -> Result<(), ExecError> {
    let tag = TAG_RUN_JOB + rank as u64;
    tracing::info!(rank, "dispatch worker started");
    loop {
        let command = loop {
            if let Some(command) = comm.try_recv(rank, tag)? {
                break command;
            }
            std::thread::sleep(poll_interval);
        };
        if command == TERMINATE_SENTINEL {
            break;
        }
        let reply = match shell.run(&command, cwd) {
            Ok(output) if output.success() => "0".to_string(),
            Ok(output) => format!(
                "command {:?} exited with {}: {}",
                command,
                output.status,
                output.stderr.trim()
            ),
            Err(e) => e.to_string(),
        };
        comm.send(0, tag, &reply)?;
    }
    tracing::info!(rank, "dispatch worker finished");
    Ok(())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
