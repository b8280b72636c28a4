// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing protocol actions: save, launch, schedule, stop, reset,
//! continue, delete. Modification safety is checked against the runs
//! graph before anything structural happens.

use crate::error::ProjectError;
use crate::project::{Project, PROJECT_RUNS};
use chrono::Utc;
use lw_core::{ObjId, Protocol, RunMode, Status, UNKNOWN_JOBID};
use lw_store::Store;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// Options for [`Project::launch_protocol`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Block until the run exits (tests)
    pub wait: bool,
    /// The run was prepared by `schedule`: working dir and run store
    /// already exist and are preserved
    pub scheduled: bool,
    /// Skip the modification-safety re-check (workflow-wide restarts)
    pub force: bool,
}

fn label_numbering_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Literal pattern, cannot fail
        #[allow(clippy::unwrap_used)]
        let re = regex::Regex::new(r"^(?P<prefix>.+)\((?P<number>\d*)\)\s*$").unwrap();
        re
    })
}

impl Project {
    // --- modification safety ---

    /// Error text naming every run that consumes one of `protocols` and is
    /// not itself modifiable, excluding runs inside the action set.
    fn dependents_error(&mut self, protocols: &[&Protocol]) -> Result<String, ProjectError> {
        let in_set: Vec<ObjId> = protocols.iter().map(|p| p.id).collect();
        let mut error = String::new();

        for prot in protocols {
            let (name, referrers) = {
                let graph = self.runs_graph(false)?;
                let referrers: Vec<(ObjId, String)> = graph
                    .children(&prot.id.to_string())
                    .into_iter()
                    .filter_map(|node| node.payload.map(|id| (id, node.label.clone())))
                    .collect();
                (prot.run_name(), referrers)
            };
            let blocking: Vec<String> = referrers
                .into_iter()
                .filter(|(id, _)| !in_set.contains(id))
                .filter(|(id, _)| {
                    self.get_protocol(*id)
                        .map(|child| !child.status.is_modifiable())
                        .unwrap_or(false)
                })
                .map(|(_, label)| label)
                .collect();
            if !blocking.is_empty() {
                error.push_str(&format!("\n *{}* is referenced from:\n   - ", name));
                error.push_str(&blocking.join("\n   - "));
            }
        }
        Ok(error)
    }

    /// Fail with `ReadOnly` or `ModificationNotAllowed` when any of the
    /// protocols cannot be structurally modified.
    pub fn check_modification_allowed(
        &mut self,
        protocols: &[&Protocol],
        msg: &str,
    ) -> Result<(), ProjectError> {
        if self.opened_read_only() {
            return Err(ProjectError::ReadOnly(msg.to_string()));
        }
        let error = self.dependents_error(protocols)?;
        if !error.is_empty() {
            return Err(ProjectError::ModificationNotAllowed(format!("{msg}{error}")));
        }
        Ok(())
    }

    // --- creation ---

    /// Create a new protocol instance of a registered class, labeled with
    /// an incremental `(N)` suffix when the default label is taken.
    pub fn new_protocol(&mut self, class_name: &str) -> Result<Protocol, ProjectError> {
        let mut prot = self.registry.instantiate(class_name)?;
        let default_label = self
            .registry
            .get(class_name)
            .map(|d| d.label.clone())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| class_name.to_string());

        let mut max_suffix: u32 = 0;
        for run in self.runs(false)? {
            let other = &run.label;
            if let Some(caps) = label_numbering_regex().captures(other) {
                if caps["prefix"].trim() == default_label {
                    max_suffix = caps["number"].parse().unwrap_or(0).max(max_suffix);
                }
            } else if *other == default_label {
                max_suffix = max_suffix.max(1);
            }
        }
        prot.label = if max_suffix > 0 {
            format!("{} ({})", default_label, max_suffix + 1)
        } else {
            default_label
        };
        Ok(prot)
    }

    // --- persistence actions ---

    /// Persist a protocol as `Saved`. Fails when the protocol is consumed
    /// by other runs or is currently running/finished/launched.
    pub fn save_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        self.check_modification_allowed(&[prot], "Cannot SAVE protocol.")?;

        if matches!(prot.status, Status::Running | Status::Finished | Status::Launched) {
            return Err(ProjectError::ModificationNotAllowed(format!(
                "Cannot SAVE a protocol that is {}. Copy it instead.",
                prot.status
            )));
        }

        prot.set_status(Status::Saved);
        if prot.id.is_set() {
            self.store_protocol(prot)?;
        } else {
            self.setup_protocol(prot)?;
        }
        self.invalidate_runs();
        Ok(())
    }

    // --- launch / schedule ---

    /// Launch a protocol now.
    ///
    /// Unmet prerequisites fall back to `schedule`. Unless forced (or the
    /// protocol is interactive/streaming), modification safety is
    /// re-checked first. On restart the protocol's outgoing relations are
    /// deleted and its working directory cleaned.
    pub fn launch_protocol(
        &mut self,
        prot: &mut Protocol,
        options: LaunchOptions,
    ) -> Result<(), ProjectError> {
        if self.opened_read_only() {
            return Err(ProjectError::ReadOnly("Cannot LAUNCH protocol.".to_string()));
        }

        if !options.scheduled && self.has_unmet_prerequisites(prot)? {
            return self.schedule_protocol(prot, &[], Duration::ZERO);
        }

        let is_restart = prot.run_mode == RunMode::Restart;
        if !options.force {
            let plain = !prot.is_interactive() && !prot.is_streaming_open();
            if plain || is_restart {
                self.check_modification_allowed(&[prot], "Cannot RE-LAUNCH protocol.")?;
            }
        }

        prot.set_status(Status::Launched);
        self.setup_protocol(prot)?;

        if !options.scheduled {
            self.make_paths_and_clean(prot)?;
            if is_restart {
                self.store.delete_relations(prot.id)?;
            }
            self.store.commit()?;
            // The run reads project state from its own copy of the store
            Store::copy_file(&self.db_path(), &self.path.join(prot.local_db_path()))?;
        }

        let host = self.host_config(&prot.host_name);
        let result = self.launcher.clone().launch(prot, &host, &self.path, options.wait)?;
        prot.job_id = Some(result.job_id.clone());
        prot.pid = result.pid;
        if result.job_id == UNKNOWN_JOBID {
            prot.set_failed("launcher returned no job id");
        }

        if options.wait {
            self.update_protocol(prot, false, false);
        } else {
            self.store_protocol(prot)?;
        }
        self.store.commit()?;
        self.invalidate_runs();
        Ok(())
    }

    /// Schedule a protocol: it launches itself once its input data is
    /// available and its prerequisites are finished.
    pub fn schedule_protocol(
        &mut self,
        prot: &mut Protocol,
        prerequisites: &[ObjId],
        initial_sleep: Duration,
    ) -> Result<(), ProjectError> {
        if self.opened_read_only() {
            return Err(ProjectError::ReadOnly("Cannot SCHEDULE protocol.".to_string()));
        }
        let is_restart = prot.run_mode == RunMode::Restart;

        prot.set_status(Status::Scheduled);
        for prereq in prerequisites {
            if !prot.prerequisites.contains(prereq) {
                prot.prerequisites.push(*prereq);
            }
        }

        self.setup_protocol(prot)?;
        self.make_paths_and_clean(prot)?;
        if is_restart {
            self.store.delete_relations(prot.id)?;
        }
        self.store.commit()?;
        Store::copy_file(&self.db_path(), &self.path.join(prot.local_db_path()))?;

        let host = self.host_config(&prot.host_name);
        let result = self
            .launcher
            .clone()
            .schedule(prot, &host, &self.path, initial_sleep)?;
        prot.job_id = Some(result.job_id.clone());
        prot.pid = result.pid;
        if result.job_id == UNKNOWN_JOBID {
            prot.set_failed("launcher returned no job id");
        }

        self.store_protocol(prot)?;
        self.invalidate_runs();
        Ok(())
    }

    fn has_unmet_prerequisites(&self, prot: &Protocol) -> Result<bool, ProjectError> {
        for prereq in &prot.prerequisites {
            match self.get_protocol(*prereq) {
                Ok(other) if !other.status.is_finished() => return Ok(true),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(protocol = %prot.id, prereq = %prereq, "missing prerequisite");
                }
            }
        }
        Ok(false)
    }

    // --- stop / reset / continue ---

    /// Stop a running protocol. The run is marked `Aborted` and persisted
    /// to both stores even when the launcher-side stop fails.
    pub fn stop_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        let host = self.host_config(&prot.host_name);
        let stop_result = if prot.is_active() {
            self.launcher.clone().stop(prot, &host)
        } else {
            Ok(())
        };
        if let Err(e) = &stop_result {
            tracing::error!(protocol = %prot.id, error = %e, "couldn't stop the protocol");
        }

        prot.set_status(Status::Aborted);
        prot.ended = Some(Utc::now());
        self.write_local_store(prot);
        self.store_protocol(prot)?;
        self.invalidate_runs();

        stop_result.map_err(Into::into)
    }

    /// Reset a protocol to `Saved`, cleaning its working directory. The
    /// next execution will be a restart.
    pub fn reset_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        if prot.is_active() {
            let host = self.host_config(&prot.host_name);
            if let Err(e) = self.launcher.clone().stop(prot, &host) {
                tracing::error!(protocol = %prot.id, error = %e, "couldn't stop the protocol");
            }
        }

        prot.set_status(Status::Saved);
        prot.run_mode = RunMode::Restart;
        prot.outputs.clear();
        prot.error = None;
        prot.ended = None;
        self.clean_working_dir(prot)?;
        self.make_paths_and_clean(prot)?;
        self.store_protocol(prot)?;
        self.invalidate_runs();
        Ok(())
    }

    /// Let a protocol waiting at an interactive step continue.
    pub fn continue_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        prot.continue_from_interactive();
        self.launch_protocol(prot, LaunchOptions { force: true, ..Default::default() })
    }

    // --- deletion ---

    /// Delete protocols, their relations, and their working directories.
    pub fn delete_protocols(&mut self, protocols: &[&Protocol]) -> Result<(), ProjectError> {
        self.check_modification_allowed(protocols, "Cannot DELETE protocols.")?;

        for prot in protocols {
            self.store.delete_relations(prot.id)?;
            self.store.delete(prot.id)?;
            // Outputs are child rows of the run
            let output_ids: Vec<ObjId> =
                prot.outputs.values().map(|o| o.id).filter(|id| self.store.exists(*id)).collect();
            for id in output_ids {
                self.store.delete(id)?;
            }

            if prot.working_dir.starts_with(PROJECT_RUNS) {
                self.clean_working_dir(prot)?;
            } else {
                tracing::info!(
                    protocol = %prot.id,
                    working_dir = %prot.working_dir.display(),
                    "not deleting working dir outside {PROJECT_RUNS}"
                );
            }
        }
        self.store.commit()?;
        self.invalidate_runs();
        Ok(())
    }

    /// Delete one output of a protocol, refusing while consumers exist.
    pub fn delete_protocol_output(
        &mut self,
        prot: &mut Protocol,
        output_key: &str,
    ) -> Result<(), ProjectError> {
        let Some(output) = prot.outputs.get(output_key).cloned() else {
            return Ok(());
        };

        let consumers: Vec<String> = {
            let prot_key = prot.id.to_string();
            let graph = self.runs_graph(false)?;
            graph
                .children(&prot_key)
                .into_iter()
                .filter_map(|node| node.payload)
                .collect::<Vec<ObjId>>()
        }
        .into_iter()
        .filter_map(|id| self.get_protocol(id).ok())
        .filter(|child| {
            child.status != Status::Saved
                && child
                    .input_pointers()
                    .iter()
                    .any(|(_, p)| p.target == output.id || p.target == prot.id)
        })
        .map(|child| child.run_name())
        .collect();

        if !consumers.is_empty() {
            return Err(ProjectError::ModificationNotAllowed(format!(
                "Cannot DELETE Object, it is referenced from:\n - {}",
                consumers.join("\n - ")
            )));
        }

        prot.outputs.shift_remove(output_key);
        if self.store.exists(output.id) {
            self.store.delete(output.id)?;
        }
        self.store_protocol(prot)?;
        Store::copy_file(&self.db_path(), &self.path.join(prot.local_db_path()))?;
        self.invalidate_runs();
        Ok(())
    }

    // --- working directories ---

    /// Create the run's working directory tree (and wipe it first on
    /// restart).
    pub(crate) fn make_paths_and_clean(&self, prot: &Protocol) -> Result<(), ProjectError> {
        if prot.run_mode == RunMode::Restart {
            self.clean_working_dir(prot)?;
        }
        let wd = self.path.join(&prot.working_dir);
        std::fs::create_dir_all(&wd)?;
        std::fs::create_dir_all(self.path.join(prot.logs_path()))?;
        std::fs::create_dir_all(wd.join("extra"))?;
        std::fs::create_dir_all(wd.join("tmp"))?;
        Ok(())
    }

    pub(crate) fn clean_working_dir(&self, prot: &Protocol) -> Result<(), ProjectError> {
        if prot.working_dir.as_os_str().is_empty() {
            return Ok(());
        }
        let wd: PathBuf = self.path.join(&prot.working_dir);
        if wd.exists() {
            std::fs::remove_dir_all(&wd)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
