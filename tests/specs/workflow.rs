// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow specs: level-paced restarts and streaming resume.

use crate::specs::prelude::*;
use lw_project::{LaunchOptions, INITIAL_SLEEP};
use std::time::Duration;

/// Restarting a chain schedules each level with a growing initial sleep:
/// 0 s, 2 s, 4 s for a three-level chain paced at 2 s.
#[test]
fn restart_paces_levels_by_two_seconds() {
    let mut t = super::prelude::project();
    let (a, b, c) = chain(&mut t);

    let (entries, _) = t.project.workflow_from(a.id).expect("workflow");
    let errors = t
        .project
        .launch_workflow(entries, RunMode::Restart, Duration::from_secs(2));
    assert!(errors.is_empty(), "{errors:?}");

    let schedules: Vec<_> = t
        .launcher
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            FakeLaunchCall::Schedule { protocol, initial_sleep } => {
                Some((protocol, initial_sleep))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        schedules,
        vec![
            (a.id, Duration::ZERO),
            (b.id, Duration::from_secs(2)),
            (c.id, Duration::from_secs(4)),
        ]
    );
}

/// Resuming a workflow whose root cannot stream reports the error and
/// stops processing further entries.
#[test]
fn resume_of_non_streaming_root_stops_early() {
    let mut t = super::prelude::project();
    let mut align = t.project.new_protocol("ProtAlignMovies").expect("new");
    t.project.save_protocol(&mut align).expect("save");

    let (entries, _) = t.project.workflow_from(align.id).expect("workflow");
    let errors = t.project.launch_workflow(entries, RunMode::Resume, INITIAL_SLEEP);

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("not in streaming"));
    assert!(t.launcher.calls().is_empty());
}

/// Resuming a streaming chain reopens the root's sets and reschedules
/// the whole closure.
#[test]
fn resume_reopens_streaming_root() {
    let mut t = super::prelude::project();
    let (mut a, b, c) = chain(&mut t);
    a.close_output_sets();
    t.project.store_protocol(&mut a).expect("store");

    let (entries, _) = t.project.workflow_from(a.id).expect("workflow");
    let errors = t.project.launch_workflow(entries, RunMode::Resume, INITIAL_SLEEP);
    assert!(errors.is_empty(), "{errors:?}");

    let stored = t.project.get_protocol(a.id).expect("a");
    assert_eq!(stored.status, Status::Scheduled);
    assert_eq!(
        stored.outputs["outputMovies"].stream_state,
        Some(lw_core::StreamState::Open)
    );

    // Descendants were restarted
    for id in [b.id, c.id] {
        let prot = t.project.get_protocol(id).expect("descendant");
        assert_eq!(prot.status, Status::Scheduled);
        assert_eq!(prot.run_mode, RunMode::Restart);
    }
}

/// Stopping a workflow aborts its active runs and reports the rest.
#[test]
fn stop_workflow_aborts_active_runs() {
    let mut t = super::prelude::project();
    let (a, mut b, _) = chain(&mut t);
    t.project
        .launch_protocol(&mut b, LaunchOptions::default())
        .expect("launch");
    b.set_status(Status::Running);
    t.project.store_protocol(&mut b).expect("store");

    let (_, active) = t.project.workflow_from(a.id).expect("workflow");
    assert_eq!(active, vec![b.id]);

    let failed = t.project.stop_workflow(&active);
    assert!(failed.is_empty());
    assert_eq!(t.project.get_protocol(b.id).expect("b").status, Status::Aborted);
}
