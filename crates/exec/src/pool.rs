// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-pool step executor.
//!
//! N worker slots over the step DAG. Shared state is the step list itself,
//! guarded by one mutex; the main loop books free nodes onto runnable
//! steps and workers report completion by marking step status under the
//! same lock.

use crate::error::ExecError;
use crate::executor::{
    are_pending, invoke_step, runnable_indices, ExecutorHooks, SharedSteps, StepExecutor,
    IDLE_SLEEP,
};
use crate::step::{StepContext, WorkerConfig};
use lw_core::Status;
use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Distribute GPU ids over `n` workers.
///
/// More GPUs than workers: consecutive `⌊K/N⌋` slices per worker (any
/// trailing remainder is discarded). Otherwise the list is repeated until
/// every worker holds exactly one.
pub fn partition_gpus(gpus: &[String], n: usize) -> Vec<Vec<String>> {
    if n == 0 || gpus.is_empty() {
        return vec![Vec::new(); n];
    }
    let k = gpus.len();
    if k > n {
        let chunk = k / n;
        (0..n)
            .map(|i| gpus[i * chunk..(i + 1) * chunk].to_vec())
            .collect()
    } else {
        (0..n).map(|i| vec![gpus[i % k].clone()]).collect()
    }
}

/// Runs steps in parallel on `n_workers` worker threads.
pub struct ThreadPoolExecutor {
    config: WorkerConfig,
    n_workers: usize,
    gpu_slices: Vec<Vec<String>>,
}

impl ThreadPoolExecutor {
    pub fn new(config: WorkerConfig, n_workers: usize) -> Self {
        let n_workers = n_workers.max(1);
        let gpu_slices = partition_gpus(&config.gpus, n_workers);
        Self { config, n_workers, gpu_slices }
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// The GPU slice worker `id` will see in its context.
    pub fn gpu_slice(&self, id: usize) -> &[String] {
        self.gpu_slices.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn context_for(&self, node: usize, counter: Arc<AtomicU32>) -> StepContext {
        StepContext::new(
            node,
            self.config.cwd.clone(),
            self.gpu_slices.get(node).cloned().unwrap_or_default(),
            counter,
            Arc::clone(&self.config.runner),
        )
    }
}

impl StepExecutor for ThreadPoolExecutor {
    fn run_steps(
        &self,
        steps: &SharedSteps,
        hooks: &mut ExecutorHooks<'_>,
    ) -> Result<(), ExecError> {
        let check_every = Duration::from_secs(hooks.steps_check_secs);
        let mut last_check = Instant::now();

        // node → running step index; nodes without an entry are free
        let mut running: HashMap<usize, usize> = HashMap::new();
        let mut free_nodes: Vec<usize> = (0..self.n_workers).collect();
        // Submission counters survive across steps on the same node
        let counters: Vec<Arc<AtomicU32>> =
            (0..self.n_workers).map(|_| Arc::new(AtomicU32::new(0))).collect();
        let mut handles: Vec<std::thread::JoinHandle<()>> = Vec::new();

        'main: loop {
            // Collect nodes whose step stopped running and notify
            let finished: Vec<(usize, lw_core::StepRecord)> = {
                let guard = steps.lock();
                running
                    .iter()
                    .filter(|(_, &si)| !guard[si].record.is_running())
                    .map(|(&node, &si)| (node, guard[si].record.clone()))
                    .collect()
            };
            let mut do_continue = true;
            for (node, record) in finished {
                running.remove(&node);
                free_nodes.push(node);
                do_continue = (hooks.on_step_finished)(&record);
                if !do_continue {
                    break;
                }
            }
            if !do_continue {
                break 'main;
            }

            // Book free nodes onto runnable steps
            let mut launched = Vec::new();
            let any_pending;
            {
                let mut guard = steps.lock();
                if !free_nodes.is_empty() {
                    for si in runnable_indices(&guard, free_nodes.len()) {
                        let node = match free_nodes.pop() {
                            Some(n) => n,
                            None => break,
                        };
                        guard[si].record.status = Status::Running;
                        running.insert(node, si);
                        launched.push((node, si, guard[si].record.clone(), guard[si].take_run()));
                    }
                }
                any_pending = are_pending(&guard);
            }

            let any_launched = !launched.is_empty();
            for (node, si, record, run) in launched {
                (hooks.on_step_started)(&record);
                let steps = Arc::clone(steps);
                let mut ctx = self.context_for(node, Arc::clone(&counters[node]));
                handles.push(std::thread::spawn(move || {
                    let result = invoke_step(run, &mut ctx);
                    let mut guard = steps.lock();
                    match result {
                        Ok(()) => guard[si].record.status = Status::Finished,
                        Err(e) => {
                            tracing::error!(step = si + 1, error = %e, "step failed in worker");
                            guard[si].record.set_failed(e);
                        }
                    }
                }));
            }

            if !any_launched {
                if any_pending {
                    std::thread::sleep(IDLE_SLEEP);
                } else {
                    break;
                }
            }

            if last_check.elapsed() >= check_every {
                (hooks.on_steps_check)(&mut steps.lock());
                last_check = Instant::now();
            }
        }

        (hooks.on_steps_check)(&mut steps.lock());

        // Wait for every worker before returning
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked during join");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
