// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol copying.
//!
//! A copy takes the definition parameters, never the outputs, and gets a
//! `(copy)` / `(copy N)` label. Copying a list rewires the inputs between
//! the clones in a second pass so the new sub-workflow reproduces the
//! original dependencies.

use crate::error::ProjectError;
use crate::project::Project;
use lw_core::{ObjId, ParamValue, Pointer, Protocol, RunMode};
use std::collections::HashMap;
use std::sync::OnceLock;

fn copy_suffix_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Literal pattern, cannot fail
        #[allow(clippy::unwrap_used)]
        let re = regex::Regex::new(r"^(?P<prefix>.+\s\(copy)(?P<number>[^)]*)\)\s*$").unwrap();
        re
    })
}

impl Project {
    /// Copy one protocol: definition attributes only, labeled with the
    /// next free `(copy N)` suffix, run mode reset to restart.
    pub fn copy_protocol(&mut self, protocol: &Protocol) -> Result<Protocol, ProjectError> {
        let mut copy = self.clone_protocol(protocol)?;
        self.save_protocol(&mut copy)?;
        Ok(copy)
    }

    /// Copy a list of protocols and rewire the inputs among the clones.
    ///
    /// Every (parent, child) edge inside the list is reproduced: each
    /// matched output-key → input-key pair repoints the cloned child's
    /// input at the cloned parent.
    pub fn copy_protocols(
        &mut self,
        protocols: &[Protocol],
    ) -> Result<Vec<Protocol>, ProjectError> {
        // Pass 1: clone all nodes
        let mut clones: HashMap<ObjId, Protocol> = HashMap::new();
        let mut order: Vec<ObjId> = Vec::new();
        for prot in protocols {
            let mut copy = self.clone_protocol(prot)?;
            self.save_protocol(&mut copy)?;
            clones.insert(prot.id, copy);
            order.push(prot.id);
        }

        // Pass 2: rewire all edges between clones
        for parent in protocols {
            let children: Vec<ObjId> = {
                let graph = self.runs_graph(false)?;
                graph
                    .children(&parent.id.to_string())
                    .into_iter()
                    .filter_map(|node| node.payload)
                    .collect()
            };
            let new_parent_id = match clones.get(&parent.id) {
                Some(clone) => clone.id,
                None => continue,
            };

            for child_id in children {
                if !clones.contains_key(&child_id) {
                    continue;
                }
                let child = self.get_protocol(child_id)?;
                let matches = io_matches(parent, &child);
                let Some(new_child) = clones.get_mut(&child_id) else {
                    continue;
                };
                for (out_key, in_key) in matches {
                    repoint_input(new_child, &in_key, parent, new_parent_id, &out_key);
                }
                self.store_protocol(new_child)?;
            }
        }

        self.store.commit()?;
        self.invalidate_runs();
        Ok(order.into_iter().filter_map(|id| clones.remove(&id)).collect())
    }

    /// Clone definition attributes and compute the `(copy N)` label.
    fn clone_protocol(&mut self, protocol: &Protocol) -> Result<Protocol, ProjectError> {
        let mut copy = self.registry.instantiate(&protocol.class_name)?;
        copy.inputs = protocol.inputs.clone();
        copy.host_name = protocol.host_name.clone();
        copy.use_queue = protocol.use_queue;
        copy.queue_params = protocol.queue_params.clone();
        copy.run_mode = RunMode::Restart;
        copy.label = self.copy_label(&protocol.run_name())?;
        Ok(copy)
    }

    /// `"x"` → `"x (copy)"`, `"x (copy)"` → `"x (copy 2)"`, always above
    /// any suffix already present in the project.
    fn copy_label(&mut self, old_name: &str) -> Result<String, ProjectError> {
        let (prefix, old_number) = match copy_suffix_regex().captures(old_name) {
            Some(caps) => {
                let number = caps["number"].trim();
                let number: u32 = if number.is_empty() { 1 } else { number.parse().unwrap_or(1) };
                (caps["prefix"].to_string(), number)
            }
            None => (format!("{old_name} (copy"), 0),
        };
        let mut new_number = old_number + 1;

        for run in self.runs(false)? {
            if let Some(caps) = copy_suffix_regex().captures(&run.label) {
                if caps["prefix"] == prefix {
                    let number = caps["number"].trim();
                    let number: u32 =
                        if number.is_empty() { 1 } else { number.parse().unwrap_or(1) };
                    if new_number <= number {
                        new_number = number + 1;
                    }
                }
            }
        }

        Ok(if new_number == 1 {
            format!("{prefix})")
        } else {
            format!("{prefix} {new_number})")
        })
    }
}

/// Matched output-key → input-key pairs between a parent's outputs and a
/// child's inputs: pointer identity to the parent run, or pointed object
/// id equal to one of the parent's outputs.
pub(crate) fn io_matches(parent: &Protocol, child: &Protocol) -> Vec<(String, String)> {
    let mut matches = Vec::new();
    for (in_key, value) in &child.inputs {
        for pointer in value.pointers() {
            if pointer.target == parent.id {
                if let Some(out_key) = pointer.extended.first() {
                    matches.push((out_key.clone(), in_key.clone()));
                }
            } else {
                for (out_key, output) in &parent.outputs {
                    if output.id == pointer.target {
                        matches.push((out_key.clone(), in_key.clone()));
                    }
                }
            }
        }
    }
    matches
}

/// Point the named input of `child` at the cloned parent's output.
///
/// Pointer-list inputs repoint only the elements that referenced the
/// original parent; scalar-with-pointer inputs keep their value and swap
/// the backing pointer.
fn repoint_input(
    child: &mut Protocol,
    in_key: &str,
    old_parent: &Protocol,
    new_parent_id: ObjId,
    out_key: &str,
) {
    let Some(value) = child.inputs.get_mut(in_key) else {
        return;
    };
    let new_pointer = Pointer::with_extended(new_parent_id, out_key);
    match value {
        ParamValue::Scalar { .. } => {}
        ParamValue::Pointer { pointer } | ParamValue::ScalarPointer { pointer, .. } => {
            *pointer = new_pointer;
        }
        ParamValue::PointerList { pointers } => {
            for pointer in pointers {
                let was_parent = pointer.target == old_parent.id
                    || old_parent.outputs.values().any(|o| o.id == pointer.target);
                if was_parent {
                    *pointer = new_pointer.clone();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "copy_tests.rs"]
mod tests;
