// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor specs: dependency order, GPU slicing, queue polling.

use lw_core::Status;
use lw_exec::{
    next_poll_wait, partition_gpus, ExecutorHooks, FakeShell, JobRunner, QueueRunner, SharedSteps,
    Step, StepExecutor, ThreadPoolExecutor, WorkerConfig,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Thread pool with N=3 over steps 1..6 where 4 needs {1,2}, 5 needs {3}
/// and 6 needs {4,5}: starts respect every prerequisite and all steps
/// finish.
#[test]
fn pool_orders_the_six_step_diamond() {
    let trace: Arc<Mutex<Vec<(bool, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let step = |index: usize, prereqs: Vec<usize>| {
        let trace = Arc::clone(&trace);
        Step::new(
            index,
            prereqs,
            Box::new(move |_ctx| {
                trace.lock().push((true, index));
                std::thread::sleep(Duration::from_millis(5));
                trace.lock().push((false, index));
                Ok(())
            }),
        )
    };
    let steps: SharedSteps = Arc::new(Mutex::new(vec![
        step(1, vec![]),
        step(2, vec![]),
        step(3, vec![]),
        step(4, vec![1, 2]),
        step(5, vec![3]),
        step(6, vec![4, 5]),
    ]));

    ThreadPoolExecutor::new(WorkerConfig::new("/tmp"), 3)
        .run_steps(&steps, &mut ExecutorHooks::default())
        .expect("run steps");

    assert!(steps.lock().iter().all(|s| s.record.status == Status::Finished));

    let trace = trace.lock();
    let pos = |start: bool, index: usize| {
        trace
            .iter()
            .position(|&(s, i)| s == start && i == index)
            .unwrap_or_else(|| panic!("missing event for step {index}"))
    };
    for (step, prereqs) in [(4, [1, 2].as_slice()), (5, &[3]), (6, &[4, 5])] {
        for &p in prereqs {
            assert!(pos(false, p) < pos(true, step), "step {step} ran before {p}");
        }
    }
    // Step 6 is last to start
    for other in 1..=5 {
        assert!(pos(true, other) < pos(true, 6));
    }
}

/// GPU list [0,1,2,3,4] over two workers: [0,1] and [2,3], the trailing
/// id is discarded.
#[test]
fn five_gpus_two_workers_slices() {
    let gpus: Vec<String> = (0..5).map(|i| i.to_string()).collect();
    let slices = partition_gpus(&gpus, 2);
    assert_eq!(slices[0], vec!["0", "1"]);
    assert_eq!(slices[1], vec!["2", "3"]);
}

/// An empty poll answer means the job left the queue and is done.
#[test]
fn queue_treats_empty_poll_as_finished() {
    let dir = tempfile::tempdir().expect("tempdir");
    let shell = Arc::new(FakeShell::new());
    shell.push_output("4242"); // submission answer
    shell.push_output(""); // poll answer

    let host = Arc::new(lw_exec::HostConfig {
        submit_command: "sbatch %(JOB_SCRIPT)s".to_string(),
        submit_template: "%(JOB_COMMAND)s".to_string(),
        check_command: "squeue -h -j %(JOB_ID)s".to_string(),
        ..lw_exec::HostConfig::default()
    });
    let runner = QueueRunner::with_shell(
        host,
        HashMap::new(),
        "spec",
        dir.path(),
        Arc::clone(&shell) as Arc<dyn lw_exec::Shell>,
    )
    .poll_start(Duration::from_millis(1));

    let config = WorkerConfig::new(dir.path());
    let mut ctx = lw_exec::step::solo_context(&config);
    assert_eq!(runner.run_job(&mut ctx, "true").expect("job"), 0);
    assert_eq!(shell.calls().len(), 2);
}

/// Poll back-off: 3, 6, 9, … capped at 300, never shrinking.
#[test]
fn queue_backoff_caps_at_five_minutes() {
    let mut wait = Duration::from_secs(3);
    let mut previous = wait;
    for _ in 0..200 {
        wait = next_poll_wait(wait);
        assert!(wait >= previous);
        assert!(wait <= Duration::from_secs(300));
        previous = wait;
    }
    assert_eq!(wait, Duration::from_secs(300));
}
