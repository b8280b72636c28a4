// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed DAG primitive.
//!
//! Used for the runs graph and for relation-graph projections. Nodes carry
//! a payload and are addressed by unique string keys; a node may be reached
//! through alias keys as well. Cycles are tolerated (user protocols can
//! write inconsistent relations): the recursive walk detects them and logs
//! a warning instead of failing.

use std::collections::HashMap;

/// One node of a [`Graph`].
#[derive(Debug)]
pub struct Node<P> {
    pub key: String,
    pub label: String,
    pub payload: P,
    children: Vec<usize>,
    parents: Vec<usize>,
}

impl<P> Node<P> {
    fn new(key: String, label: String, payload: P) -> Self {
        Self {
            key,
            label,
            payload,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }
}

/// Directed graph with string keys, alias lookup, and a synthetic root.
#[derive(Debug)]
pub struct Graph<P> {
    nodes: Vec<Node<P>>,
    index: HashMap<String, usize>,
    root: usize,
}

impl<P> Graph<P> {
    /// Create a graph holding only the synthetic root node.
    pub fn new(root_key: impl Into<String>, root_payload: P) -> Self {
        let key = root_key.into();
        let mut index = HashMap::new();
        index.insert(key.clone(), 0);
        Self {
            nodes: vec![Node::new(key.clone(), key, root_payload)],
            index,
            root: 0,
        }
    }

    pub fn root(&self) -> &Node<P> {
        &self.nodes[self.root]
    }

    pub fn root_key(&self) -> &str {
        &self.nodes[self.root].key
    }

    /// Create a node. If the key is already taken the existing node is kept
    /// and returned.
    pub fn create_node(&mut self, key: impl Into<String>, label: impl Into<String>, payload: P) -> &mut Node<P> {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            tracing::warn!(key = %key, "graph node already exists, keeping first");
            return &mut self.nodes[i];
        }
        let i = self.nodes.len();
        self.nodes.push(Node::new(key.clone(), label.into(), payload));
        self.index.insert(key, i);
        &mut self.nodes[i]
    }

    /// Register an alternative key resolving to an existing node.
    pub fn alias(&mut self, key: &str, alt: impl Into<String>) {
        if let Some(&i) = self.index.get(key) {
            self.index.insert(alt.into(), i);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Node<P>> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node<P>> {
        let i = *self.index.get(key)?;
        Some(&mut self.nodes[i])
    }

    /// Add a parent→child edge. Unknown keys are ignored with a warning.
    pub fn add_child(&mut self, parent: &str, child: &str) {
        let (Some(&p), Some(&c)) = (self.index.get(parent), self.index.get(child)) else {
            tracing::warn!(parent, child, "cannot add edge between unknown nodes");
            return;
        };
        if !self.nodes[p].children.contains(&c) {
            self.nodes[p].children.push(c);
            self.nodes[c].parents.push(p);
        }
    }

    /// Direct children of a node.
    pub fn children(&self, key: &str) -> Vec<&Node<P>> {
        match self.index.get(key) {
            Some(&i) => self.nodes[i].children.iter().map(|&c| &self.nodes[c]).collect(),
            None => Vec::new(),
        }
    }

    /// First parent of a node, if any.
    pub fn parent(&self, key: &str) -> Option<&Node<P>> {
        let &i = self.index.get(key)?;
        self.nodes[i].parents.first().map(|&p| &self.nodes[p])
    }

    /// True when the node has no parents (the synthetic root always is).
    pub fn is_root(&self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&i) => self.nodes[i].parents.is_empty(),
            None => false,
        }
    }

    /// Every node reachable below `key`, depth-first, excluding the node
    /// itself. A back edge is reported once as a warning and not followed.
    pub fn descendants(&self, key: &str) -> Vec<&Node<P>> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(key) else {
            return out;
        };
        let mut visited = vec![false; self.nodes.len()];
        let mut on_stack = vec![false; self.nodes.len()];
        self.walk(start, &mut visited, &mut on_stack, &mut out);
        out
    }

    fn walk<'a>(
        &'a self,
        i: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        out: &mut Vec<&'a Node<P>>,
    ) {
        on_stack[i] = true;
        for &c in &self.nodes[i].children {
            if on_stack[c] {
                tracing::warn!(
                    from = %self.nodes[i].key,
                    to = %self.nodes[c].key,
                    "cycle detected in graph walk, skipping edge"
                );
                continue;
            }
            if !visited[c] {
                visited[c] = true;
                out.push(&self.nodes[c]);
                self.walk(c, visited, on_stack, out);
            }
        }
        on_stack[i] = false;
    }

    /// Attach every parentless non-root node under the synthetic root.
    pub fn adopt_orphans(&mut self) {
        let orphans: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| i != self.root && self.nodes[i].parents.is_empty())
            .collect();
        for i in orphans {
            self.nodes[self.root].children.push(i);
            self.nodes[i].parents.push(self.root);
        }
    }

    /// All nodes, root included, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<P>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
