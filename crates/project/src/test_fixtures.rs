// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for scheduler tests.

use crate::project::{Project, ProjectOptions};
use crate::registry::{KindDef, Registry};
use lw_core::{ObjId, ParamKind, ParamValue, Pointer, Protocol};
use lw_exec::FakeLauncher;
use std::sync::Arc;

pub(crate) struct Fixture {
    // Owns the on-disk project for the test's lifetime
    pub dir: tempfile::TempDir,
    pub project: Project,
    pub launcher: Arc<FakeLauncher>,
}

pub(crate) fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(
        KindDef::new("ProtImportMovies", "import movies")
            .streaming()
            .param_default("samplingRate", ParamKind::Scalar, "1.0")
            .param("filesPath", ParamKind::Scalar),
    );
    registry.register(
        KindDef::new("ProtAlignMovies", "align movies")
            .param("inputMovies", ParamKind::Pointer)
            .param_default("gpuList", ParamKind::Scalar, ""),
    );
    registry.register(
        KindDef::new("ProtCtf", "estimate ctf")
            .param("inputMicrographs", ParamKind::Pointer),
    );
    registry.register(
        KindDef::new("ProtJoinSets", "join sets").param("inputSets", ParamKind::PointerList),
    );
    registry.register(
        KindDef::new("ProtMaskVolume", "mask volume")
            .param("inputVolume", ParamKind::Pointer)
            .param_default("radius", ParamKind::ScalarPointer, "0"),
    );
    registry.register(
        KindDef::new("ProtManualPicking", "manual picking")
            .interactive()
            .param("inputMicrographs", ParamKind::Pointer),
    );
    registry
}

pub(crate) fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let launcher = Arc::new(FakeLauncher::new());
    let project = Project::create(
        dir.path().join("proj"),
        registry(),
        ProjectOptions::new(launcher.clone()),
    )
    .unwrap_or_else(|e| panic!("create project: {e}"));
    Fixture { dir, project, launcher }
}

/// Launch a protocol (so its run store exists) and then force a status,
/// the way an executing run would report it.
pub(crate) fn drive_to(f: &mut Fixture, prot: &mut Protocol, status: lw_core::Status) {
    f.project
        .launch_protocol(prot, crate::actions::LaunchOptions::default())
        .unwrap_or_else(|e| panic!("launch: {e}"));
    prot.set_status(status);
    f.project
        .store_protocol(prot)
        .unwrap_or_else(|e| panic!("store: {e}"));
}

pub(crate) fn pointer_input(prot: &mut Protocol, name: &str, target: ObjId, out_key: &str) {
    prot.inputs.insert(
        name.to_string(),
        ParamValue::pointer(Pointer::with_extended(target, out_key)),
    );
}

/// A saved three-run chain: import → align → ctf, with outputs registered
/// on the first two runs.
pub(crate) fn chain(f: &mut Fixture) -> (Protocol, Protocol, Protocol) {
    let project = &mut f.project;

    let mut a = project.new_protocol("ProtImportMovies").unwrap_or_else(|e| panic!("{e}"));
    project.save_protocol(&mut a).unwrap_or_else(|e| panic!("{e}"));
    project
        .register_output(&mut a, "outputMovies", "SetOfMovies", true)
        .unwrap_or_else(|e| panic!("{e}"));

    let mut b = project.new_protocol("ProtAlignMovies").unwrap_or_else(|e| panic!("{e}"));
    pointer_input(&mut b, "inputMovies", a.id, "outputMovies");
    project.save_protocol(&mut b).unwrap_or_else(|e| panic!("{e}"));
    project
        .register_output(&mut b, "outputMicrographs", "SetOfMicrographs", false)
        .unwrap_or_else(|e| panic!("{e}"));

    let mut c = project.new_protocol("ProtCtf").unwrap_or_else(|e| panic!("{e}"));
    pointer_input(&mut c, "inputMicrographs", b.id, "outputMicrographs");
    project.save_protocol(&mut c).unwrap_or_else(|e| panic!("{e}"));

    (a, b, c)
}
