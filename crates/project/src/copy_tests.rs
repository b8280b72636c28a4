// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_fixtures::{chain, fixture};
use lw_core::{RunMode, Status};

#[test]
fn copy_takes_definition_never_outputs() {
    let mut f = fixture();
    let (mut a, _, _) = chain(&mut f);
    a.comment = "hand-tuned dose".to_string();
    f.project.store_protocol(&mut a).unwrap();
    assert!(!a.outputs.is_empty());

    let copy = f.project.copy_protocol(&a).unwrap();
    assert_ne!(copy.id, a.id);
    assert_eq!(copy.class_name, a.class_name);
    assert_eq!(copy.inputs, a.inputs);
    assert!(copy.outputs.is_empty());
    // Only host and queue settings carry over beyond the definition
    assert_eq!(copy.host_name, a.host_name);
    assert!(copy.comment.is_empty());
    assert_eq!(copy.status, Status::Saved);
    assert_eq!(copy.run_mode, RunMode::Restart);
}

#[test]
fn copy_labels_count_up() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtAlignMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();

    let first = f.project.copy_protocol(&a).unwrap();
    assert_eq!(first.label, "align movies (copy)");

    let second = f.project.copy_protocol(&a).unwrap();
    assert_eq!(second.label, "align movies (copy 2)");

    // Copying a copy keeps the prefix and picks the next number
    let third = f.project.copy_protocol(&first).unwrap();
    assert_eq!(third.label, "align movies (copy 3)");
}

#[test]
fn copy_list_rewires_pointers_to_clones() {
    let mut f = fixture();
    let (a, b, _) = chain(&mut f);

    let copies = f.project.copy_protocols(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(copies.len(), 2);
    let (new_a, new_b) = (&copies[0], &copies[1]);

    let pointers = new_b.input_pointers();
    assert_eq!(pointers.len(), 1);
    let (_, pointer) = pointers[0];
    assert_eq!(pointer.target, new_a.id);
    assert_eq!(pointer.extended, vec!["outputMovies".to_string()]);

    // The clone edges exist in the runs graph
    f.project.invalidate_runs();
    let graph = f.project.runs_graph(true).unwrap();
    let below: Vec<_> = graph
        .children(&new_a.id.to_string())
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(below, vec![new_b.id]);
}

#[test]
fn copy_of_child_alone_keeps_external_pointer() {
    let mut f = fixture();
    let (a, b, _) = chain(&mut f);

    let copies = f.project.copy_protocols(&[b.clone()]).unwrap();
    let new_b = &copies[0];

    // The source is outside the copied set, so the pointer still names it
    let pointers = new_b.input_pointers();
    assert_eq!(pointers[0].1.target, a.id);
}

#[test]
fn copy_list_rewires_pointer_list_elements() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    f.project.register_output(&mut a, "outputMovies", "SetOfMovies", false).unwrap();

    let mut other = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut other).unwrap();
    f.project.register_output(&mut other, "outputMovies", "SetOfMovies", false).unwrap();

    let mut join = f.project.new_protocol("ProtJoinSets").unwrap();
    join.inputs.insert(
        "inputSets".to_string(),
        lw_core::ParamValue::PointerList {
            pointers: vec![
                lw_core::Pointer::with_extended(a.id, "outputMovies"),
                lw_core::Pointer::with_extended(other.id, "outputMovies"),
            ],
        },
    );
    f.project.save_protocol(&mut join).unwrap();

    let copies = f.project.copy_protocols(&[a.clone(), join.clone()]).unwrap();
    let (new_a, new_join) = (&copies[0], &copies[1]);

    match &new_join.inputs["inputSets"] {
        lw_core::ParamValue::PointerList { pointers } => {
            // The element naming a was repointed; the other survived
            assert_eq!(pointers[0].target, new_a.id);
            assert_eq!(pointers[1].target, other.id);
        }
        other => panic!("expected pointer list, got {other:?}"),
    }
}

#[test]
fn copy_list_rewires_scalar_pointer_inputs() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    f.project.register_output(&mut a, "outputVolume", "Volume", false).unwrap();

    let mut mask = f.project.new_protocol("ProtMaskVolume").unwrap();
    mask.inputs.insert(
        "inputVolume".to_string(),
        lw_core::ParamValue::pointer(lw_core::Pointer::with_extended(a.id, "outputVolume")),
    );
    mask.inputs.insert(
        "radius".to_string(),
        lw_core::ParamValue::ScalarPointer {
            value: "32".to_string(),
            pointer: lw_core::Pointer::with_extended(a.id, "outputVolume"),
        },
    );
    f.project.save_protocol(&mut mask).unwrap();

    let copies = f.project.copy_protocols(&[a.clone(), mask.clone()]).unwrap();
    let (new_a, new_mask) = (&copies[0], &copies[1]);

    match &new_mask.inputs["radius"] {
        lw_core::ParamValue::ScalarPointer { value, pointer } => {
            assert_eq!(value, "32");
            assert_eq!(pointer.target, new_a.id);
        }
        other => panic!("expected scalar pointer, got {other:?}"),
    }
}

#[test]
fn io_matches_finds_by_identity_and_output_id() {
    let mut f = fixture();
    let (a, mut b, _) = chain(&mut f);

    // By pointer identity (run id + extended)
    assert_eq!(
        io_matches(&a, &b),
        vec![("outputMovies".to_string(), "inputMovies".to_string())]
    );

    // By pointed object id
    let out_id = a.outputs["outputMovies"].id;
    b.inputs.insert(
        "inputMovies".to_string(),
        lw_core::ParamValue::pointer(lw_core::Pointer::to(out_id)),
    );
    assert_eq!(
        io_matches(&a, &b),
        vec![("outputMovies".to_string(), "inputMovies".to_string())]
    );
}
