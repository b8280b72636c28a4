// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ProjectError;
use crate::test_fixtures::{fixture, registry};
use lw_core::Status;
use lw_exec::FakeLauncher;

#[test]
fn create_lays_out_project_directories() {
    let f = fixture();
    let root = f.project.path();
    for sub in [PROJECT_LOGS, PROJECT_RUNS, PROJECT_TMP, PROJECT_UPLOAD, PROJECT_CONFIG] {
        assert!(root.join(sub).is_dir(), "missing {sub}");
    }
    assert!(root.join(PROJECT_DB).is_file());
    assert!(root.join(PROJECT_SETTINGS).is_file());
}

#[test]
fn load_without_db_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("empty")).unwrap();
    let err = Project::load(
        dir.path().join("empty"),
        registry(),
        ProjectOptions::new(Arc::new(FakeLauncher::new())),
    )
    .unwrap_err();
    assert!(matches!(err, ProjectError::MissingProjectDb(_)));
}

#[test]
fn creation_time_survives_reload() {
    let f = fixture();
    let created = f.project.creation_time().unwrap();
    let path = f.project.path().to_path_buf();
    f.project.close().unwrap();

    let reloaded = Project::load(
        path,
        registry(),
        ProjectOptions::new(Arc::new(FakeLauncher::new())),
    )
    .unwrap();
    assert_eq!(reloaded.creation_time(), Some(created));
}

#[test]
fn get_protocol_round_trips_through_store() {
    let mut f = fixture();
    let mut prot = f.project.new_protocol("ProtAlignMovies").unwrap();
    f.project.save_protocol(&mut prot).unwrap();
    assert!(prot.id.is_set());

    let loaded = f.project.get_protocol(prot.id).unwrap();
    assert_eq!(loaded.class_name, "ProtAlignMovies");
    assert_eq!(loaded.label, prot.label);
    assert_eq!(loaded.status, Status::Saved);

    let err = f.project.get_protocol(ObjId(999)).unwrap_err();
    assert!(matches!(err, ProjectError::ProtocolNotFound(_)));
}

#[test]
fn new_protocol_labels_count_up() {
    let mut f = fixture();
    let mut first = f.project.new_protocol("ProtAlignMovies").unwrap();
    assert_eq!(first.label, "align movies");
    f.project.save_protocol(&mut first).unwrap();

    let mut second = f.project.new_protocol("ProtAlignMovies").unwrap();
    assert_eq!(second.label, "align movies (2)");
    f.project.save_protocol(&mut second).unwrap();

    let third = f.project.new_protocol("ProtAlignMovies").unwrap();
    assert_eq!(third.label, "align movies (3)");
}

#[test]
fn setup_assigns_working_dir_from_id() {
    let mut f = fixture();
    let mut prot = f.project.new_protocol("ProtCtf").unwrap();
    f.project.setup_protocol(&mut prot).unwrap();
    assert_eq!(
        prot.working_dir,
        PathBuf::from(format!("Runs/{:06}_ProtCtf", prot.id.0))
    );
}

#[test]
fn register_output_creates_child_row() {
    let mut f = fixture();
    let mut prot = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut prot).unwrap();

    let out_id = f
        .project
        .register_output(&mut prot, "outputMovies", "SetOfMovies", true)
        .unwrap();

    let row = f.project.get_object(out_id).unwrap();
    assert_eq!(row.class_name, "SetOfMovies");
    assert_eq!(row.parent_id, Some(prot.id));
    assert!(prot.outputs["outputMovies"].is_set_output());

    // Visible through the relation with the store parent walk
    assert_eq!(f.project.store().parent_of(out_id).map(|r| r.id), Some(prot.id));
}

#[test]
fn unknown_host_falls_back() {
    let f = fixture();
    let host = f.project.host_config("gpu-cluster-17");
    assert_eq!(host.name, "localhost");
}

#[test]
fn protocols_by_class_filters() {
    let mut f = fixture();
    let mut a = f.project.new_protocol("ProtAlignMovies").unwrap();
    f.project.save_protocol(&mut a).unwrap();
    let mut b = f.project.new_protocol("ProtCtf").unwrap();
    f.project.save_protocol(&mut b).unwrap();

    assert_eq!(f.project.protocols_by_class("ProtAlignMovies").len(), 1);
    assert_eq!(f.project.protocols_by_class("ProtMissing").len(), 0);
}

#[test]
fn runs_exclude_output_rows() {
    let mut f = fixture();
    let mut prot = f.project.new_protocol("ProtImportMovies").unwrap();
    f.project.save_protocol(&mut prot).unwrap();
    f.project
        .register_output(&mut prot, "outputMovies", "SetOfMovies", false)
        .unwrap();

    let runs = f.project.runs(true).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].class_name, "ProtImportMovies");
}
