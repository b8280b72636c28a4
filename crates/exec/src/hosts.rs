// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host configurations.
//!
//! A host describes how protocols execute somewhere: the queue submission
//! and status templates, default queue parameters, and the done-detection
//! regex. Templates use `%(NAME)s` placeholders, the form the
//! configuration files have always carried.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostsError {
    #[error("cannot read hosts file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse hosts file {path}: {source}")]
    Parse {
        path: String,
        source: Box<toml::de::Error>,
    },
}

/// Execution host definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host name (injected from the hosts-file map key)
    #[serde(skip)]
    pub name: String,
    /// Command template wrapping MPI jobs
    pub mpi_command: String,
    /// Queue submission command, e.g. `"sbatch %(JOB_SCRIPT)s"`
    pub submit_command: String,
    /// Body of the generated submission script
    pub submit_template: String,
    /// Status query command with `%(JOB_ID)s`
    pub check_command: String,
    /// Job cancellation command with `%(JOB_ID)s`
    pub cancel_command: String,
    /// Regex matched against non-empty status output to detect completion.
    /// Absent means non-empty output is treated as still running.
    pub job_done_regex: Option<String>,
    /// Default queue parameters merged under per-protocol ones
    pub queues_default: HashMap<String, String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "localhost".to_string(),
            mpi_command: "mpirun -np %(JOB_NODES)s %(COMMAND)s".to_string(),
            submit_command: String::new(),
            submit_template: String::new(),
            check_command: String::new(),
            cancel_command: String::new(),
            job_done_regex: None,
            queues_default: HashMap::new(),
        }
    }
}

impl HostConfig {
    /// Substitute `%(NAME)s` placeholders from the variable map. Unknown
    /// placeholders are left untouched.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut out = template.to_string();
        for (key, value) in vars {
            out = out.replace(&format!("%({key})s"), value);
        }
        out
    }

    /// Parse a hosts file: a toml table of host name → definition.
    pub fn load_file(path: &Path) -> Result<HashMap<String, HostConfig>, HostsError> {
        let text = std::fs::read_to_string(path).map_err(|source| HostsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut hosts: HashMap<String, HostConfig> =
            toml::from_str(&text).map_err(|source| HostsError::Parse {
                path: path.display().to_string(),
                source: Box::new(source),
            })?;
        for (name, host) in hosts.iter_mut() {
            host.name = name.clone();
        }
        Ok(hosts)
    }

    /// A single default localhost entry, used when no hosts file exists.
    pub fn default_hosts() -> HashMap<String, HostConfig> {
        let host = HostConfig::default();
        HashMap::from([(host.name.clone(), host)])
    }
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod tests;
