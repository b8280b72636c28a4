// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runs graph: protocol dependencies derived from input pointers.

use crate::error::ProjectError;
use crate::project::Project;
use lw_core::{Graph, ObjId};
use std::collections::HashMap;

/// Node payload is the run's id; `None` on the synthetic PROJECT root.
pub type RunsGraph = Graph<Option<ObjId>>;

pub const ROOT_KEY: &str = "PROJECT";

impl Project {
    /// The dependency graph over non-child runs: an edge A→B whenever one
    /// of B's input pointers resolves to A or to one of A's outputs.
    /// Cached; invalidated on any structural change.
    pub fn runs_graph(&mut self, refresh: bool) -> Result<&RunsGraph, ProjectError> {
        if refresh || self.runs.is_none() {
            self.runs(refresh)?;
        }
        if self.runs_graph.is_none() {
            self.runs_graph = Some(self.build_runs_graph());
        }
        // Freshly set above when absent
        match &self.runs_graph {
            Some(graph) => Ok(graph),
            None => unreachable!("runs graph was just built"),
        }
    }

    fn build_runs_graph(&self) -> RunsGraph {
        let runs: Vec<_> = self
            .runs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|r| !r.is_child())
            .collect();

        let mut graph: RunsGraph = Graph::new(ROOT_KEY, None);
        // Producer index: run id and every output object id → node key
        let mut producers: HashMap<ObjId, String> = HashMap::new();

        for run in &runs {
            let key = run.id.to_string();
            graph.create_node(&key, run.run_name(), Some(run.id));
            producers.insert(run.id, key.clone());
            for output in run.outputs.values() {
                producers.insert(output.id, key.clone());
            }
        }

        for run in &runs {
            let child_key = run.id.to_string();
            for (_, pointer) in run.input_pointers() {
                let mut resolved = producers.get(&pointer.target);
                if resolved.is_none() {
                    // The pointer may name a grandchild object; climb to
                    // its parent before giving up
                    if let Some(parent) = self.store.parent_of(pointer.target) {
                        resolved = producers.get(&parent.id);
                    }
                }
                match resolved {
                    Some(parent_key) if *parent_key == child_key => {
                        tracing::warn!(
                            run = %child_key,
                            "found a cyclic dependence from a node to itself, probably a bug"
                        );
                    }
                    Some(parent_key) => graph.add_child(parent_key, &child_key),
                    None => {}
                }
            }
        }

        graph.adopt_orphans();
        graph
    }
}

#[cfg(test)]
#[path = "runs_graph_tests.rs"]
mod tests;
