// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project errors

use lw_core::ObjId;
use lw_exec::hosts::HostsError;
use lw_exec::ExecError;
use lw_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from project loading and scheduler actions
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Fatal at load: the directory holds no project store
    #[error("project database not found at {0}")]
    MissingProjectDb(PathBuf),
    /// Mutation attempted while the project is read-only
    #[error("{0} Running in READ-ONLY mode.")]
    ReadOnly(String),
    /// A structural mutation would break a consumer run
    #[error("{0}")]
    ModificationNotAllowed(String),
    #[error("invalid protocol id: {0}")]
    ProtocolNotFound(ObjId),
    #[error("unknown protocol class {0:?}")]
    UnknownClass(String),
    #[error("{0}")]
    Workflow(String),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hosts(#[from] HostsError),
    #[error("workflow json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    Settings(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
