// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command seam.
//!
//! Queue submission, status polling, and local job commands all go through
//! this trait so tests can script outcomes without spawning processes.

use crate::error::ExecError;
use std::path::Path;
use std::process::Command;

/// Captured result of one shell command
#[derive(Debug, Clone, Default)]
pub struct ShellOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs a command line through the system shell
pub trait Shell: Send + Sync {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput, ExecError>;
}

/// Real `sh -c` execution
#[derive(Debug, Clone, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, command: &str, cwd: &Path) -> Result<ShellOutput, ExecError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .map_err(|e| ExecError::Shell(format!("failed to run {command:?}: {e}")))?;
        Ok(ShellOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Scripted shell for tests: pops outputs in order and records every call.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeShell {
    outputs: parking_lot::Mutex<std::collections::VecDeque<ShellOutput>>,
    calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeShell {
    pub fn new() -> Self {
        Self {
            outputs: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Queue the output for the next call. Calls beyond the scripted
    /// outputs return empty success.
    pub fn push_output(&self, stdout: impl Into<String>) {
        self.outputs.lock().push_back(ShellOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        });
    }

    pub fn push_failure(&self, status: i32, stderr: impl Into<String>) {
        self.outputs.lock().push_back(ShellOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeShell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Shell for FakeShell {
    fn run(&self, command: &str, _cwd: &Path) -> Result<ShellOutput, ExecError> {
        self.calls.lock().push(command.to_string());
        Ok(self.outputs.lock().pop_front().unwrap_or_default())
    }
}
