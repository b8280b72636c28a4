// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-exec: Step execution for one protocol.
//!
//! The executor family drives a protocol's internal step DAG with bounded
//! parallelism: serially, on a thread pool, through a batch queue, or by
//! dispatching commands to remote workers. The launcher hands whole
//! protocols to the operating system (or the queue) as separate processes.

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod hosts;
pub mod launch;
pub mod pool;
pub mod process;
pub mod queue;
pub mod shell;
pub mod step;

pub use dispatch::{worker_loop, ChannelComm, Comm, DispatchRunner, TAG_RUN_JOB, TERMINATE_SENTINEL};
pub use error::ExecError;
pub use executor::{ExecutorHooks, SerialExecutor, SharedSteps, StepExecutor};
pub use hosts::HostConfig;
#[cfg(any(test, feature = "test-support"))]
pub use launch::FakeLauncher;
pub use launch::{LaunchResult, Launcher, ProcessLauncher};
pub use pool::{partition_gpus, ThreadPoolExecutor};
pub use process::pid_alive;
pub use queue::{next_poll_wait, QueueRunner};
#[cfg(any(test, feature = "test-support"))]
pub use shell::FakeShell;
pub use shell::{Shell, ShellOutput, SystemShell};
pub use step::{JobRunner, LocalRunner, Step, StepContext, WorkerConfig};
