// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_fixtures::{chain, fixture, pointer_input};
use lw_core::Pointer;

#[test]
fn chain_builds_parent_child_edges() {
    let mut f = fixture();
    let (a, b, c) = chain(&mut f);

    let graph = f.project.runs_graph(true).unwrap();
    let roots: Vec<_> = graph
        .children(ROOT_KEY)
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(roots, vec![a.id]);

    let below_a: Vec<_> = graph.children(&a.id.to_string()).iter().filter_map(|n| n.payload).collect();
    assert_eq!(below_a, vec![b.id]);
    let below_b: Vec<_> = graph.children(&b.id.to_string()).iter().filter_map(|n| n.payload).collect();
    assert_eq!(below_b, vec![c.id]);
}

#[test]
fn unconnected_run_hangs_under_root() {
    let mut f = fixture();
    let (_, _, _) = chain(&mut f);
    let mut lone = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut lone).unwrap();

    let graph = f.project.runs_graph(true).unwrap();
    let roots: Vec<_> = graph.children(ROOT_KEY).iter().filter_map(|n| n.payload).collect();
    assert!(roots.contains(&lone.id));
}

#[test]
fn pointer_at_output_object_resolves_to_producer() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    let out_id = f
        .project
        .register_output(&mut a, "outputMovies", "SetOfMovies", false)
        .unwrap();

    // Legacy-form pointer: straight at the output object, no extended path
    let mut b = f.project.new_protocol("ProtAlignMovies").unwrap();
    b.inputs.insert(
        "inputMovies".to_string(),
        lw_core::ParamValue::pointer(Pointer::to(out_id)),
    );
    f.project.save_protocol(&mut b).unwrap();

    let graph = f.project.runs_graph(true).unwrap();
    let below_a: Vec<_> = graph.children(&a.id.to_string()).iter().filter_map(|n| n.payload).collect();
    assert_eq!(below_a, vec![b.id]);
}

#[test]
fn self_reference_is_warned_not_edged() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtAlignMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    let a_id = a.id;
    pointer_input(&mut a, "inputMovies", a_id, "outputMovies");
    f.project.store_protocol(&mut a).unwrap();
    f.project.invalidate_runs();

    let graph = f.project.runs_graph(true).unwrap();
    assert!(graph.children(&a.id.to_string()).is_empty());
}

#[test]
fn graph_is_acyclic_for_valid_projects() {
    let mut f = fixture();
    let (a, _, _) = chain(&mut f);

    let graph = f.project.runs_graph(true).unwrap();
    // A walk from the root visits every run exactly once
    let visited = graph.descendants(ROOT_KEY);
    assert_eq!(visited.len(), 3);
    // And no run reaches back to A
    for node in graph.descendants(&a.id.to_string()) {
        assert!(!graph
            .descendants(&node.key)
            .iter()
            .any(|n| n.payload == Some(a.id)));
    }
}

#[test]
fn structural_change_invalidates_cache() {
    let mut f = fixture();
    let (a, b, c) = chain(&mut f);
    assert_eq!(f.project.runs_graph(true).unwrap().descendants(ROOT_KEY).len(), 3);

    f.project.delete_protocols(&[&c]).unwrap();
    let graph = f.project.runs_graph(false).unwrap();
    let keys: Vec<_> = graph.descendants(ROOT_KEY).iter().map(|n| n.key.clone()).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&a.id.to_string()) && keys.contains(&b.id.to_string()));
}
