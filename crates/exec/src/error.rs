// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor and launcher errors

use thiserror::Error;

/// Errors from step execution, queue submission, dispatch, and launching
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("step failed: {0}")]
    StepFailed(String),
    #[error("queue submission failed: {0}")]
    QueueSubmitFailed(String),
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("dispatch error: {0}")]
    Dispatch(String),
    #[error("shell error: {0}")]
    Shell(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
