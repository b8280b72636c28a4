// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime steps and worker contexts.
//!
//! A runtime [`Step`] pairs the persisted record with its run closure. The
//! [`StepContext`] replaces the original design's thread-local state: each
//! worker carries its id, its GPU slice, and its submission counter
//! explicitly, and step closures reach the executor's job-running strategy
//! through it.

use crate::error::ExecError;
use crate::shell::{Shell, SystemShell};
use lw_core::{Status, StepRecord};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The run closure of one step. Failures are reported as strings and end
/// up on the step record.
pub type StepFn = Box<dyn FnOnce(&mut StepContext) -> Result<(), String> + Send>;

/// One executable step: persisted record plus run closure.
pub struct Step {
    pub record: StepRecord,
    run: Option<StepFn>,
}

impl Step {
    pub fn new(index: usize, prerequisites: Vec<usize>, run: StepFn) -> Self {
        Self {
            record: StepRecord::new(index, prerequisites),
            run: Some(run),
        }
    }

    pub fn from_record(record: StepRecord, run: StepFn) -> Self {
        Self { record, run: Some(run) }
    }

    /// Take the run closure; each step runs at most once per execution.
    pub(crate) fn take_run(&mut self) -> Option<StepFn> {
        self.run.take()
    }

    pub fn status(&self) -> Status {
        self.record.status
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("record", &self.record)
            .field("has_run", &self.run.is_some())
            .finish()
    }
}

/// Strategy for executing one job command from inside a step.
///
/// The thread-pool executor runs commands locally; the queue variant turns
/// each into a batch submission; the dispatch variant sends it to a remote
/// worker rank.
pub trait JobRunner: Send + Sync {
    /// Run a command on behalf of the worker owning `ctx`; returns the
    /// command's exit code.
    fn run_job(&self, ctx: &mut StepContext, command: &str) -> Result<i32, ExecError>;
}

/// Runs job commands directly through the shell.
pub struct LocalRunner {
    shell: Arc<dyn Shell>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self { shell: Arc::new(SystemShell) }
    }

    pub fn with_shell(shell: Arc<dyn Shell>) -> Self {
        Self { shell }
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner for LocalRunner {
    fn run_job(&self, ctx: &mut StepContext, command: &str) -> Result<i32, ExecError> {
        let output = self.shell.run(command, &ctx.cwd)?;
        if !output.success() {
            return Err(ExecError::StepFailed(format!(
                "command {:?} exited with {}: {}",
                command,
                output.status,
                output.stderr.trim()
            )));
        }
        Ok(output.status)
    }
}

/// Shared executor configuration handed to every worker.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Directory job commands run in (threaded through explicitly; the
    /// engine never changes the process-wide working directory)
    pub cwd: PathBuf,
    /// GPU ids to distribute among workers
    pub gpus: Vec<String>,
    pub runner: Arc<dyn JobRunner>,
}

impl WorkerConfig {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            gpus: Vec::new(),
            runner: Arc::new(LocalRunner::new()),
        }
    }

    pub fn gpus(mut self, gpus: Vec<String>) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn JobRunner>) -> Self {
        self.runner = runner;
        self
    }
}

/// Per-worker execution context passed to step closures.
pub struct StepContext {
    pub worker_id: usize,
    pub cwd: PathBuf,
    gpus: Vec<String>,
    counter: Arc<AtomicU32>,
    runner: Arc<dyn JobRunner>,
}

impl StepContext {
    pub fn new(
        worker_id: usize,
        cwd: PathBuf,
        gpus: Vec<String>,
        counter: Arc<AtomicU32>,
        runner: Arc<dyn JobRunner>,
    ) -> Self {
        Self { worker_id, cwd, gpus, counter, runner }
    }

    /// The GPU slice assigned to this worker.
    pub fn gpu_list(&self) -> &[String] {
        &self.gpus
    }

    /// Next per-worker submission sub-id, `"{worker}-{n}"`.
    pub fn next_sub_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.worker_id, n)
    }

    /// Run a job command through the executor's strategy.
    pub fn run_job(&mut self, command: &str) -> Result<i32, ExecError> {
        let runner = Arc::clone(&self.runner);
        runner.run_job(self, command)
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("worker_id", &self.worker_id)
            .field("cwd", &self.cwd)
            .field("gpus", &self.gpus)
            .finish()
    }
}

/// Liveness probe used by step closures that want cooperative cancellation:
/// the engine never interrupts a worker thread.
pub fn step_cancelled(record: &StepRecord) -> bool {
    record.status == Status::Aborted || record.status == Status::Failed
}

/// Convenience for building a context outside the pool (serial executor,
/// tests).
pub fn solo_context(config: &WorkerConfig) -> StepContext {
    StepContext::new(
        0,
        config.cwd.clone(),
        config.gpus.clone(),
        Arc::new(AtomicU32::new(0)),
        Arc::clone(&config.runner),
    )
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;

#[cfg(test)]
pub(crate) use test_helpers::*;

#[cfg(test)]
mod test_helpers {
    use super::*;

    /// Step that records its execution order in a shared log.
    pub(crate) fn logging_step(
        index: usize,
        prerequisites: Vec<usize>,
        log: Arc<parking_lot::Mutex<Vec<usize>>>,
    ) -> Step {
        Step::new(
            index,
            prerequisites,
            Box::new(move |_ctx| {
                log.lock().push(index);
                Ok(())
            }),
        )
    }

    /// Step that fails with the given message.
    pub(crate) fn failing_step(index: usize, message: &str) -> Step {
        let message = message.to_string();
        Step::new(index, vec![], Box::new(move |_ctx| Err(message)))
    }
}
