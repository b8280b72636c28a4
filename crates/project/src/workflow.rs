// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow-wide actions.
//!
//! A workflow is the dependency closure below one protocol, annotated with
//! BFS levels. Restart reschedules every level with a growing initial
//! sleep; resume reopens streaming outputs and reschedules, restarting
//! non-streaming descendants. Errors are collected per entry and returned,
//! never raised.

use crate::error::ProjectError;
use crate::project::Project;
use indexmap::IndexMap;
use lw_core::{ObjId, Protocol, RunMode, Status};
use std::time::Duration;

/// Default pacing between scheduled workflow levels.
pub const INITIAL_SLEEP: Duration = Duration::from_secs(1);

/// One entry of a level-annotated workflow map.
#[derive(Debug, Clone)]
pub struct WorkflowEntry {
    pub protocol: Protocol,
    /// BFS distance from the action root in the runs graph
    pub level: u32,
}

impl Project {
    /// The workflow rooted at `root`: every reachable run with its BFS
    /// level (max level wins on diamond joins), plus the ids of active
    /// non-interactive runs in it.
    pub fn workflow_from(
        &mut self,
        root: ObjId,
    ) -> Result<(IndexMap<ObjId, WorkflowEntry>, Vec<ObjId>), ProjectError> {
        let mut entries: IndexMap<ObjId, WorkflowEntry> = IndexMap::new();
        let mut active: Vec<ObjId> = Vec::new();
        let mut queue: std::collections::VecDeque<ObjId> = std::collections::VecDeque::new();
        queue.push_back(root);

        let root_prot = self.get_protocol(root)?;
        entries.insert(root, WorkflowEntry { protocol: root_prot, level: 0 });

        while let Some(id) = queue.pop_front() {
            let level = entries.get(&id).map(|e| e.level).unwrap_or(0) + 1;
            let protocol = match entries.get(&id) {
                Some(entry) => entry.protocol.clone(),
                None => continue,
            };
            if protocol.is_active()
                && protocol.status != Status::Interactive
                && !active.contains(&id)
            {
                active.push(id);
            }

            let children: Vec<ObjId> = {
                let graph = self.runs_graph(false)?;
                graph
                    .children(&id.to_string())
                    .into_iter()
                    .filter_map(|node| node.payload)
                    .collect()
            };
            for child in children {
                match entries.get_mut(&child) {
                    None => {
                        let prot = self.get_protocol(child)?;
                        entries.insert(child, WorkflowEntry { protocol: prot, level });
                        queue.push_back(child);
                    }
                    Some(entry) => {
                        if level > entry.level {
                            entry.level = level;
                        }
                        if !queue.contains(&child) {
                            queue.push_back(child);
                        }
                    }
                }
            }
        }
        Ok((entries, active))
    }

    /// Launch a workflow in either mode, collecting per-entry errors.
    pub fn launch_workflow(
        &mut self,
        entries: IndexMap<ObjId, WorkflowEntry>,
        mode: RunMode,
        initial_sleep: Duration,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        match mode {
            RunMode::Restart => self.restart_workflow(entries, initial_sleep, &mut errors),
            RunMode::Resume => self.continue_workflow(entries, initial_sleep, &mut errors),
        }
        errors
    }

    /// Restart every entry: discard results and reschedule, one sleep unit
    /// per level. Interactive protocols become `Saved` and set up fresh
    /// instead of scheduled.
    pub(crate) fn restart_workflow(
        &mut self,
        entries: IndexMap<ObjId, WorkflowEntry>,
        initial_sleep: Duration,
        errors: &mut Vec<String>,
    ) {
        for (_, entry) in entries {
            let WorkflowEntry { mut protocol, level } = entry;
            if !protocol.is_interactive() {
                protocol.run_mode = RunMode::Restart;
                if let Err(e) =
                    self.schedule_protocol(&mut protocol, &[], initial_sleep * level)
                {
                    errors.push(format!(
                        "Error trying to restart the protocol: {}\nERROR: {e}",
                        protocol.run_name()
                    ));
                    break;
                }
            } else {
                let result = (|| -> Result<(), ProjectError> {
                    protocol.set_status(Status::Saved);
                    self.store_protocol(&mut protocol)?;
                    protocol.run_mode = RunMode::Restart;
                    self.setup_protocol(&mut protocol)?;
                    self.make_paths_and_clean(&protocol)?;
                    self.store.delete_relations(protocol.id)?;
                    self.store.commit()?;
                    self.store_protocol(&mut protocol)
                })();
                if let Err(e) = result {
                    errors.push(format!(
                        "Error trying to restart the protocol: {}\nERROR: {e}",
                        protocol.run_name()
                    ));
                    break;
                }
            }
        }
        self.invalidate_runs();
    }

    /// Resume a workflow, preserving previous results.
    ///
    /// Streaming entries reopen their output sets and get rescheduled with
    /// all steps back to `Saved`. Non-streaming entries deeper in the
    /// closure are restarted individually; a non-streaming action root is
    /// an error and stops processing.
    pub(crate) fn continue_workflow(
        &mut self,
        entries: IndexMap<ObjId, WorkflowEntry>,
        initial_sleep: Duration,
        errors: &mut Vec<String>,
    ) {
        for (id, entry) in entries {
            let WorkflowEntry { mut protocol, level } = entry;
            if protocol.is_interactive() {
                continue;
            }
            if protocol.works_in_streaming() {
                let result = (|| -> Result<(), ProjectError> {
                    // Reopen set outputs so the run can keep appending
                    for output in protocol.outputs.values_mut() {
                        if output.is_set_output() {
                            output.stream_state = Some(lw_core::StreamState::Open);
                        }
                    }
                    protocol.set_status(Status::Saved);
                    protocol.set_steps_status(Status::Saved);
                    self.write_local_store(&protocol);
                    self.store_protocol(&mut protocol)?;
                    self.schedule_protocol(&mut protocol, &[], initial_sleep * level)
                })();
                if let Err(e) = result {
                    errors.push(format!(
                        "Error trying to launch the protocol: {}\nERROR: {e}",
                        protocol.run_name()
                    ));
                    break;
                }
            } else if level != 0 {
                let single = IndexMap::from([(id, WorkflowEntry { protocol, level })]);
                self.restart_workflow(single, initial_sleep, errors);
            } else {
                errors.push(format!(
                    "Error trying to launch the protocol: {}\nERROR: The protocol is not in streaming",
                    protocol.run_name()
                ));
                break;
            }
        }
        self.invalidate_runs();
    }

    /// Stop every active protocol in the list; returns the ids that could
    /// not be stopped.
    pub fn stop_workflow(&mut self, active: &[ObjId]) -> Vec<ObjId> {
        let mut failed = Vec::new();
        for id in active {
            let result = self
                .get_protocol(*id)
                .and_then(|mut prot| self.stop_protocol(&mut prot));
            if let Err(e) = result {
                tracing::error!(protocol = %id, error = %e, "couldn't stop workflow protocol");
                failed.push(*id);
            }
        }
        failed
    }

    /// Reset every non-`Saved` entry; returns the ids that could not be
    /// reset.
    pub fn reset_workflow(&mut self, entries: IndexMap<ObjId, WorkflowEntry>) -> Vec<ObjId> {
        let mut failed = Vec::new();
        for (id, entry) in entries {
            let mut protocol = entry.protocol;
            if protocol.status == Status::Saved {
                continue;
            }
            if let Err(e) = self.reset_protocol(&mut protocol) {
                tracing::error!(protocol = %id, error = %e, "couldn't reset workflow protocol");
                failed.push(id);
            }
        }
        failed
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
