// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_fixtures::{chain, fixture};
use lw_core::ParamValue;

#[test]
fn export_entries_carry_identity_and_params() {
    let mut f = fixture();
    let (a, b, _) = chain(&mut f);

    let entries = f.project.protocols_dict(&[a.clone(), b.clone()]);
    assert_eq!(entries.len(), 2);

    let entry_a = &entries[0];
    assert_eq!(entry_a["object.className"], "ProtImportMovies");
    assert_eq!(entry_a["object.id"], a.id.0);
    assert_eq!(entry_a["object.label"], a.label.as_str());
    assert_eq!(entry_a["_useQueue"], false);
    assert_eq!(entry_a["samplingRate"], "1.0");

    let entry_b = &entries[1];
    assert_eq!(
        entry_b["inputMovies"],
        format!("{}.outputMovies", a.id)
    );
}

#[test]
fn export_normalizes_output_object_pointers() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    let out_id = f
        .project
        .register_output(&mut a, "outputMovies", "SetOfMovies", false)
        .unwrap();

    let mut b = f.project.new_protocol("ProtAlignMovies").unwrap();
    b.inputs.insert(
        "inputMovies".to_string(),
        ParamValue::pointer(lw_core::Pointer::to(out_id)),
    );
    f.project.save_protocol(&mut b).unwrap();

    let entries = f.project.protocols_dict(&[a.clone(), b.clone()]);
    assert_eq!(
        entries[1]["inputMovies"],
        format!("{}.outputMovies", a.id)
    );
}

#[test]
fn import_round_trip_remaps_ids_and_pointers() {
    let mut f = fixture();
    let (a, b, c) = chain(&mut f);
    let json = f.project.protocols_json(&[a.clone(), b.clone(), c.clone()]).unwrap();

    // Import into a project that already has a run, so ids shift
    let mut g = fixture();
    let mut existing = g.project.new_protocol("ProtCtf").unwrap();
    g.project.save_protocol(&mut existing).unwrap();
    let imported = g.project.load_protocols_json(&json).unwrap();
    assert_eq!(imported.len(), 3);

    let new_a = &imported[&a.id.0];
    let new_b = &imported[&b.id.0];
    let new_c = &imported[&c.id.0];
    assert_ne!(new_a.id, a.id);
    assert_eq!(new_a.class_name, "ProtImportMovies");
    assert_eq!(new_a.label, a.label);

    // B's pointer resolves to the new id of A, same output key
    let pointers = new_b.input_pointers();
    assert_eq!(pointers[0].1.target, new_a.id);
    assert_eq!(pointers[0].1.extended, vec!["outputMovies".to_string()]);

    // The imported runs graph is isomorphic to the original chain
    let graph = g.project.runs_graph(true).unwrap();
    let below_a: Vec<_> = graph
        .children(&new_a.id.to_string())
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(below_a, vec![new_b.id]);
    let below_b: Vec<_> = graph
        .children(&new_b.id.to_string())
        .iter()
        .filter_map(|n| n.payload)
        .collect();
    assert_eq!(below_b, vec![new_c.id]);
}

#[test]
fn import_skips_unknown_classes() {
    let mut f = fixture();
    let json = r#"[
        {"object.className": "ProtFromMissingPlugin", "object.id": 4,
         "object.label": "mystery", "object.comment": ""},
        {"object.className": "ProtImportMovies", "object.id": 5,
         "object.label": "import", "object.comment": ""}
    ]"#;

    let imported = f.project.load_protocols_json(json).unwrap();
    assert_eq!(imported.len(), 1);
    assert!(imported.contains_key(&5));
}

#[test]
fn import_drops_missing_prerequisites() {
    let mut f = fixture();
    let json = r#"[
        {"object.className": "ProtImportMovies", "object.id": 1,
         "object.label": "import", "object.comment": "",
         "_prerequisites": [77]}
    ]"#;

    let imported = f.project.load_protocols_json(json).unwrap();
    assert!(imported[&1].prerequisites.is_empty());
}

#[test]
fn import_remaps_prerequisites_to_new_ids() {
    let mut f = fixture();
    let json = r#"[
        {"object.className": "ProtImportMovies", "object.id": 1,
         "object.label": "first", "object.comment": ""},
        {"object.className": "ProtImportMovies", "object.id": 2,
         "object.label": "second", "object.comment": "",
         "_prerequisites": [1]}
    ]"#;

    let imported = f.project.load_protocols_json(json).unwrap();
    let first_new_id = imported[&1].id;
    assert_eq!(imported[&2].prerequisites, vec![first_new_id]);
}

#[test]
fn import_scalar_pointer_distinguishes_values_from_references() {
    let mut f = fixture();
    let json = r#"[
        {"object.className": "ProtImportMovies", "object.id": 1,
         "object.label": "import", "object.comment": ""},
        {"object.className": "ProtMaskVolume", "object.id": 2,
         "object.label": "mask", "object.comment": "",
         "inputVolume": "1.outputVolume",
         "radius": "1.5"}
    ]"#;

    let imported = f.project.load_protocols_json(json).unwrap();
    let mask = &imported[&2];

    // "1.5" stays a plain value even though old id 1 exists
    match &mask.inputs["radius"] {
        ParamValue::ScalarPointer { value, pointer } => {
            assert_eq!(value, "1.5");
            assert!(pointer.points_none());
        }
        other => panic!("expected scalar pointer, got {other:?}"),
    }
    // While "1.outputVolume" became a real reference
    match &mask.inputs["inputVolume"] {
        ParamValue::Pointer { pointer } => {
            assert_eq!(pointer.target, imported[&1].id);
        }
        other => panic!("expected pointer, got {other:?}"),
    }
}

#[test]
fn export_writes_and_loads_files() {
    let mut f = fixture();
    let (a, b, _) = chain(&mut f);
    let path = f.dir.path().join("workflow.json");
    f.project.export_protocols(&[a, b], &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with('['));

    let mut g = fixture();
    let imported = g.project.load_protocols_file(&path).unwrap();
    assert_eq!(imported.len(), 2);
}
