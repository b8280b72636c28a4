// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relation graphs: provenance projections over the relation table.
//!
//! Nodes are (run, output-key) pointers, aliased by the output object's
//! own id (the legacy pointer form). Relation triples attach children to
//! parents, trimming the parent's extended path progressively when the
//! full form is not a known node.

use crate::error::ProjectError;
use crate::project::Project;
use lw_core::{Graph, ObjId, Pointer, Relation, RELATION_SOURCE, RELATION_TRANSFORM};

/// Payload of a relation-graph node.
#[derive(Debug, Clone)]
pub struct RelationNode {
    /// Canonical pointer: producing run id + output key
    pub pointer: Pointer,
    /// Id of the output object itself
    pub object_id: ObjId,
}

pub type RelationGraph = Graph<Option<RelationNode>>;

impl Project {
    /// The TRANSFORM relation graph (cached).
    pub fn transform_graph(&mut self, refresh: bool) -> Result<&RelationGraph, ProjectError> {
        if refresh || self.transform_graph.is_none() {
            let graph = self.build_relation_graph(RELATION_TRANSFORM, refresh)?;
            self.transform_graph = Some(graph);
        }
        match &self.transform_graph {
            Some(graph) => Ok(graph),
            None => unreachable!("transform graph was just built"),
        }
    }

    /// The SOURCE relation graph (cached).
    pub fn source_graph(&mut self, refresh: bool) -> Result<&RelationGraph, ProjectError> {
        if refresh || self.source_graph.is_none() {
            let graph = self.build_relation_graph(RELATION_SOURCE, refresh)?;
            self.source_graph = Some(graph);
        }
        match &self.source_graph {
            Some(graph) => Ok(graph),
            None => unreachable!("source graph was just built"),
        }
    }

    /// Objects that used `obj` as a source.
    pub fn source_children(&self, obj: ObjId) -> Vec<ObjId> {
        self.store
            .relation_children(RELATION_SOURCE, obj)
            .into_iter()
            .map(|row| row.id)
            .collect()
    }

    /// Objects that are sources of `obj`.
    pub fn source_parents(&self, obj: ObjId) -> Vec<ObjId> {
        self.store
            .relation_parents(RELATION_SOURCE, obj)
            .into_iter()
            .map(|row| row.id)
            .collect()
    }

    fn build_relation_graph(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> Result<RelationGraph, ProjectError> {
        self.runs(refresh)?;
        let runs = self.runs.as_deref().unwrap_or_default();

        let mut graph: RelationGraph = Graph::new("PROJECT", None);
        for run in runs {
            for (out_key, output) in &run.outputs {
                let pointer = Pointer::with_extended(run.id, out_key);
                let key = pointer.unique_id();
                graph.create_node(
                    &key,
                    format!("{}.{}", run.run_name(), out_key),
                    Some(RelationNode { pointer, object_id: output.id }),
                );
                // Legacy alias: the output object's own id
                graph.alias(&key, output.id.to_string());
            }
        }

        let relations: Vec<Relation> =
            self.store.relations_by_name(name).into_iter().cloned().collect();
        for relation in relations {
            if self.store.select_by_id(relation.parent_id).is_none() {
                tracing::warn!(
                    parent = %relation.parent_id,
                    "relation seems to point to a deleted object"
                );
                continue;
            }

            // Progressive trimming: drop extended segments until the
            // pointer names a known node
            let mut parent_pointer = relation.parent_pointer();
            let mut parent_key = parent_pointer.unique_id();
            while !graph.contains(&parent_key) && parent_pointer.has_extended() {
                parent_pointer.pop_extended();
                parent_key = parent_pointer.unique_id();
            }
            if !graph.contains(&parent_key) {
                tracing::error!(parent = %relation.parent_pointer(), "relation parent node not found");
                continue;
            }
            // Resolve the alias to the node's canonical key
            let parent_key = match graph.get(&parent_key) {
                Some(node) => node.key.clone(),
                None => continue,
            };

            if self.store.select_by_id(relation.child_id).is_none() {
                tracing::error!(child = %relation.child_id, "relation child object not found");
                continue;
            }
            let child_pointer = relation.child_pointer();
            let child_key = child_pointer.unique_id();
            let child_key = match graph.get(&child_key) {
                Some(node) => node.key.clone(),
                None => {
                    tracing::error!(
                        child = %child_key,
                        parent = %parent_key,
                        "relation child node not found"
                    );
                    continue;
                }
            };
            graph.add_child(&parent_key, &child_key);
        }

        graph.adopt_orphans();
        Ok(graph)
    }

    /// Everything related to `obj` through `relation`, across its whole
    /// transform family: climb to the oldest ancestor in the transform
    /// graph, take all its descendants, then collect the children of any
    /// relation triple whose parent is in that family.
    pub fn related_objects(
        &mut self,
        relation: &str,
        obj: ObjId,
    ) -> Result<Vec<Pointer>, ProjectError> {
        let family: Vec<String> = {
            let graph = self.transform_graph(false)?;
            let Some(start) = graph.get(&obj.to_string()) else {
                return Ok(Vec::new());
            };

            // Oldest ancestor below the root
            let mut current = start.key.clone();
            loop {
                match graph.parent(&current) {
                    Some(parent) if !graph.is_root(&parent.key) => current = parent.key.clone(),
                    _ => break,
                }
            }

            let mut keys = Vec::new();
            let mut push_node = |payload: &Option<RelationNode>| {
                if let Some(node) = payload {
                    keys.push(node.pointer.unique_id());
                    keys.push(node.object_id.to_string());
                }
            };
            if let Some(node) = graph.get(&current) {
                push_node(&node.payload);
            }
            for node in graph.descendants(&current) {
                push_node(&node.payload);
            }
            keys
        };

        let mut seen = std::collections::HashSet::new();
        let mut objects = Vec::new();
        let relations: Vec<Relation> =
            self.store.relations_by_name(relation).into_iter().cloned().collect();
        for rel in relations {
            if self.store.select_by_id(rel.parent_id).is_none() {
                tracing::warn!(parent = %rel.parent_id, "relation seems to point to a deleted object");
                continue;
            }
            let parent_key = rel.parent_pointer().unique_id();
            if family.iter().any(|k| *k == parent_key) {
                let child = rel.child_pointer();
                if self.store.select_by_id(child.target).is_some()
                    && seen.insert(child.unique_id())
                {
                    objects.push(child);
                }
            }
        }
        Ok(objects)
    }
}

#[cfg(test)]
#[path = "relations_tests.rs"]
mod tests;
