// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor contract and the serial executor.

use crate::error::ExecError;
use crate::step::{solo_context, Step, WorkerConfig};
use lw_core::{Status, StepRecord};
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Steps shared between the executor loop, its workers, and the
/// steps-check hook (which may append new steps while running).
pub type SharedSteps = Arc<Mutex<Vec<Step>>>;

pub(crate) const IDLE_SLEEP: Duration = Duration::from_millis(500);

/// Default seconds between steps-check callbacks.
pub const DEFAULT_STEPS_CHECK_SECS: u64 = 3;

/// Callbacks driven by `run_steps`.
///
/// `on_step_finished` returning false aborts the loop. `on_steps_check`
/// runs every `steps_check_secs` wall-clock seconds and once more before
/// returning; streaming protocols use it to append freshly discovered
/// steps.
pub struct ExecutorHooks<'a> {
    pub on_step_started: Box<dyn FnMut(&StepRecord) + 'a>,
    pub on_step_finished: Box<dyn FnMut(&StepRecord) -> bool + 'a>,
    pub on_steps_check: Box<dyn FnMut(&mut Vec<Step>) + 'a>,
    pub steps_check_secs: u64,
}

impl Default for ExecutorHooks<'_> {
    fn default() -> Self {
        Self {
            on_step_started: Box::new(|_| {}),
            on_step_finished: Box::new(|_| true),
            on_steps_check: Box::new(|_| {}),
            steps_check_secs: DEFAULT_STEPS_CHECK_SECS,
        }
    }
}

impl<'a> ExecutorHooks<'a> {
    pub fn on_started(mut self, f: impl FnMut(&StepRecord) + 'a) -> Self {
        self.on_step_started = Box::new(f);
        self
    }

    pub fn on_finished(mut self, f: impl FnMut(&StepRecord) -> bool + 'a) -> Self {
        self.on_step_finished = Box::new(f);
        self
    }

    pub fn on_check(mut self, f: impl FnMut(&mut Vec<Step>) + 'a) -> Self {
        self.on_steps_check = Box::new(f);
        self
    }

    pub fn check_secs(mut self, secs: u64) -> Self {
        self.steps_check_secs = secs;
        self
    }
}

/// Drives the steps of one protocol to completion.
pub trait StepExecutor {
    fn run_steps(&self, steps: &SharedSteps, hooks: &mut ExecutorHooks<'_>)
        -> Result<(), ExecError>;
}

/// A step is runnable when it is `New` and every prerequisite is
/// `Finished`. Returns up to `n` indices, list order.
pub(crate) fn runnable_indices(steps: &[Step], n: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        let ready = step.record.status == Status::New
            && step.record.prerequisites.iter().all(|&p| {
                p >= 1 && p <= steps.len() && steps[p - 1].record.is_finished()
            });
        if ready {
            out.push(i);
            if out.len() == n {
                break;
            }
        }
    }
    out
}

/// True while at least one step is running or waiting, i.e. finishing it
/// could unlock more work.
pub(crate) fn are_pending(steps: &[Step]) -> bool {
    steps.iter().any(|s| s.record.is_running() || s.record.is_waiting())
}

/// Execute a step closure, turning panics into step failures.
pub(crate) fn invoke_step(
    run: Option<crate::step::StepFn>,
    ctx: &mut crate::step::StepContext,
) -> Result<(), String> {
    let Some(f) = run else {
        // Re-entered step with a spent closure: nothing left to do.
        return Ok(());
    };
    match std::panic::catch_unwind(AssertUnwindSafe(move || f(ctx))) {
        Ok(result) => result,
        Err(_) => Err("step panicked".to_string()),
    }
}

/// Runs steps one at a time, in dependency order.
///
/// Follows the same loop shape as the pool so streaming and the steps
/// graph behave identically with a single worker.
pub struct SerialExecutor {
    config: WorkerConfig,
}

impl SerialExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }
}

impl StepExecutor for SerialExecutor {
    fn run_steps(
        &self,
        steps: &SharedSteps,
        hooks: &mut ExecutorHooks<'_>,
    ) -> Result<(), ExecError> {
        let check_every = Duration::from_secs(hooks.steps_check_secs);
        let mut last_check = Instant::now();
        let mut ctx = solo_context(&self.config);

        loop {
            let next = {
                let guard = steps.lock();
                runnable_indices(&guard, 1).first().copied()
            };

            if let Some(i) = next {
                let (run, record) = {
                    let mut guard = steps.lock();
                    guard[i].record.status = Status::Running;
                    let run = guard[i].take_run();
                    (run, guard[i].record.clone())
                };
                (hooks.on_step_started)(&record);

                let result = invoke_step(run, &mut ctx);

                let record = {
                    let mut guard = steps.lock();
                    match result {
                        Ok(()) => guard[i].record.status = Status::Finished,
                        Err(e) => guard[i].record.set_failed(e),
                    }
                    guard[i].record.clone()
                };
                if !(hooks.on_step_finished)(&record) {
                    break;
                }
            } else if are_pending(&steps.lock()) {
                std::thread::sleep(IDLE_SLEEP);
            } else {
                break;
            }

            if last_check.elapsed() >= check_every {
                (hooks.on_steps_check)(&mut steps.lock());
                last_check = Instant::now();
            }
        }

        // One last check to finalize streaming output
        (hooks.on_steps_check)(&mut steps.lock());
        Ok(())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
