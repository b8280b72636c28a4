// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler specs: dependency safety, stop semantics, round trips.

use crate::specs::prelude::*;
use lw_project::{LaunchOptions, ProjectError};
use similar_asserts::assert_eq;

/// Stopping the middle of a chain touches only that run.
#[test]
fn stop_in_chain_leaves_neighbors_untouched() {
    let mut t = super::prelude::project();
    let (a, mut b, c) = chain(&mut t);
    let a_status = a.status;
    t.project
        .launch_protocol(&mut b, LaunchOptions::default())
        .expect("launch");
    b.set_status(Status::Running);
    t.project.store_protocol(&mut b).expect("store");

    t.project.stop_protocol(&mut b).expect("stop");

    assert_eq!(b.status, Status::Aborted);
    assert_eq!(t.project.get_protocol(a.id).expect("a").status, a_status);
    assert_eq!(t.project.get_protocol(c.id).expect("c").status, Status::Saved);
}

/// Deleting a producer while a consumer is active fails and persists
/// nothing.
#[test]
fn delete_of_consumed_run_is_refused() {
    let mut t = super::prelude::project();
    let (a, mut b, _) = chain(&mut t);
    t.project
        .launch_protocol(&mut b, LaunchOptions::default())
        .expect("launch");
    b.set_status(Status::Running);
    t.project.store_protocol(&mut b).expect("store");

    let err = t.project.delete_protocols(&[&a]).expect_err("must refuse");
    assert!(matches!(err, ProjectError::ModificationNotAllowed(_)));
    assert!(t.project.has_object(a.id));
}

/// Export → import reproduces the dependency structure on fresh ids.
#[test]
fn workflow_json_round_trip_is_isomorphic() {
    let mut t = super::prelude::project();
    let (a, b, c) = chain(&mut t);
    let json = t
        .project
        .protocols_json(&[a.clone(), b.clone(), c.clone()])
        .expect("export");

    let mut fresh = super::prelude::project();
    let imported = fresh.project.load_protocols_json(&json).expect("import");

    let new_ids: Vec<_> = imported.values().map(|p| p.id).collect();
    let graph = fresh.project.runs_graph(true).expect("graph");
    // Chain shape: one root, then one child each
    let below_root: Vec<_> = graph
        .children("PROJECT")
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(below_root, vec![new_ids[0]]);
    assert_eq!(
        graph
            .children(&new_ids[0].to_string())
            .iter()
            .filter_map(|n| n.payload)
            .collect::<Vec<_>>(),
        vec![new_ids[1]]
    );
    assert_eq!(
        graph
            .children(&new_ids[1].to_string())
            .iter()
            .filter_map(|n| n.payload)
            .collect::<Vec<_>>(),
        vec![new_ids[2]]
    );
}

/// A restarted run loses outputs and relations but its children keep
/// their graph edges.
#[test]
fn restart_preserves_child_edges() {
    let mut t = super::prelude::project();
    let (mut a, b, _) = chain(&mut t);
    a.set_status(Status::Finished);
    t.project.store_protocol(&mut a).expect("store");

    t.project.reset_protocol(&mut a).expect("reset");
    assert_eq!(a.status, Status::Saved);
    assert_eq!(a.run_mode, RunMode::Restart);
    assert!(a.outputs.is_empty());

    // Edge a → b survives because b still points at a
    let graph = t.project.runs_graph(true).expect("graph");
    let below: Vec<_> = graph
        .children(&a.id.to_string())
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(below, vec![b.id]);
}

/// Launching with the scripted launcher records the job id; a failing
/// launcher marks the run failed.
#[test]
fn launch_outcomes_follow_the_launcher() {
    let mut t = super::prelude::project();

    let mut good = t.project.new_protocol("ProtImportMovies").expect("new");
    t.project
        .launch_protocol(&mut good, LaunchOptions::default())
        .expect("launch");
    assert_eq!(good.status, Status::Launched);
    assert!(good.job_id.is_some());

    t.launcher.fail_next();
    let mut bad = t.project.new_protocol("ProtImportMovies").expect("new");
    t.project
        .launch_protocol(&mut bad, LaunchOptions::default())
        .expect("launch call itself succeeds");
    assert_eq!(bad.status, Status::Failed);
}
