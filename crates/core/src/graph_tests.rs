// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn diamond() -> Graph<u32> {
    // root -> a -> {b, c} -> d
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("a", "a", 1);
    g.create_node("b", "b", 2);
    g.create_node("c", "c", 3);
    g.create_node("d", "d", 4);
    g.add_child("a", "b");
    g.add_child("a", "c");
    g.add_child("b", "d");
    g.add_child("c", "d");
    g.adopt_orphans();
    g
}

#[test]
fn create_and_lookup() {
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("1", "first run", 1);
    assert!(g.contains("1"));
    assert_eq!(g.get("1").map(|n| n.payload), Some(1));
    assert_eq!(g.get("missing").map(|n| n.payload), None);
}

#[test]
fn duplicate_key_keeps_first_node() {
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("1", "first", 1);
    g.create_node("1", "second", 2);
    assert_eq!(g.get("1").map(|n| n.payload), Some(1));
    assert_eq!(g.len(), 2);
}

#[test]
fn alias_resolves_to_same_node() {
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("7.outputImages", "images", 7);
    g.alias("7.outputImages", "42");
    assert_eq!(g.get("42").map(|n| n.key.as_str()), Some("7.outputImages"));
}

#[test]
fn adopt_orphans_hangs_roots_under_project() {
    let g = diamond();
    let top: Vec<_> = g.children("PROJECT").iter().map(|n| n.key.clone()).collect();
    assert_eq!(top, vec!["a"]);
    assert!(g.is_root("PROJECT"));
    assert!(!g.is_root("b"));
}

#[test]
fn descendants_visits_each_node_once() {
    let g = diamond();
    let below: Vec<_> = g.descendants("a").iter().map(|n| n.payload).collect();
    // b, c in insertion order; d exactly once despite two paths
    assert_eq!(below.len(), 3);
    assert!(below.contains(&2) && below.contains(&3) && below.contains(&4));
}

#[test]
fn cycle_is_tolerated_in_walk() {
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("a", "a", 1);
    g.create_node("b", "b", 2);
    g.add_child("a", "b");
    g.add_child("b", "a");

    // Walk terminates and yields the reachable node once
    let below: Vec<_> = g.descendants("a").iter().map(|n| n.payload).collect();
    assert_eq!(below, vec![2]);
}

#[test]
fn edge_to_unknown_node_is_ignored() {
    let mut g: Graph<u32> = Graph::new("PROJECT", 0);
    g.create_node("a", "a", 1);
    g.add_child("a", "ghost");
    assert!(g.children("a").is_empty());
}

#[test]
fn duplicate_edge_is_not_doubled() {
    let mut g = Graph::new("PROJECT", 0);
    g.create_node("a", "a", 1);
    g.create_node("b", "b", 2);
    g.add_child("a", "b");
    g.add_child("a", "b");
    assert_eq!(g.children("a").len(), 1);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any edge set, cyclic or not, yields a terminating walk that
        /// visits each node at most once.
        #[test]
        fn walk_terminates_and_dedups(edges in proptest::collection::vec((0usize..8, 0usize..8), 0..24)) {
            let mut g = Graph::new("PROJECT", usize::MAX);
            for i in 0..8 {
                g.create_node(i.to_string(), i.to_string(), i);
            }
            for (from, to) in edges {
                g.add_child(&from.to_string(), &to.to_string());
            }
            g.adopt_orphans();

            let visited = g.descendants("PROJECT");
            prop_assert!(visited.len() <= 8);
            let mut payloads: Vec<_> = visited.iter().map(|n| n.payload).collect();
            payloads.sort_unstable();
            payloads.dedup();
            prop_assert_eq!(payloads.len(), visited.len());
        }
    }
}
