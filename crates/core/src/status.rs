// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol and step status machine.
//!
//! One status set serves both protocols and their steps. "Active" means the
//! scheduler still owes the run attention: it is launched, running, queued
//! for launch, waiting on an interactive step, or waiting on input data.

use serde::{Deserialize, Serialize};

/// Execution status shared by protocols and steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created, never persisted as anything else
    #[default]
    New,
    /// Persisted but not queued for execution
    Saved,
    /// Waiting for input availability before launch
    Scheduled,
    /// Handed to the launcher, not yet running
    Launched,
    /// Executing steps
    Running,
    /// All steps completed
    Finished,
    /// A step or the launcher failed
    Failed,
    /// Stopped by the user
    Aborted,
    /// Paused at an interactive wait point
    Interactive,
    /// Blocked on unfinished prerequisites
    Waiting,
}

crate::simple_display! {
    Status {
        New => "new",
        Saved => "saved",
        Scheduled => "scheduled",
        Launched => "launched",
        Running => "running",
        Finished => "finished",
        Failed => "failed",
        Aborted => "aborted",
        Interactive => "interactive",
        Waiting => "waiting",
    }
}

impl Status {
    /// True while the scheduler still owes this run attention.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Status::Launched
                | Status::Running
                | Status::Scheduled
                | Status::Interactive
                | Status::Waiting
        )
    }

    /// True for states that can be freely modified or deleted.
    pub fn is_modifiable(self) -> bool {
        matches!(self, Status::Saved | Status::Scheduled)
    }

    pub fn is_finished(self) -> bool {
        self == Status::Finished
    }

    pub fn is_failed(self) -> bool {
        self == Status::Failed
    }
}

/// How a protocol treats prior results when it executes again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Keep prior results and continue from where execution stopped
    #[default]
    Resume,
    /// Discard prior results and start from scratch
    Restart,
}

crate::simple_display! {
    RunMode {
        Resume => "resume",
        Restart => "restart",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
