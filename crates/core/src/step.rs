// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted step records.

use crate::status::Status;
use serde::{Deserialize, Serialize};

/// One step of a protocol, as persisted in the protocol's own store.
///
/// Prerequisites are 1-based indices into the owning protocol's step list.
/// Records survive restarts; the run closure lives in the executor, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the protocol's step list
    pub index: usize,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<usize>,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn new(index: usize, prerequisites: Vec<usize>) -> Self {
        Self {
            index,
            status: Status::New,
            prerequisites,
            interactive: false,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn is_waiting(&self) -> bool {
        self.status == Status::Waiting
    }

    pub fn set_failed(&mut self, error: impl Into<String>) {
        self.status = Status::Failed;
        self.error = Some(error.into());
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
