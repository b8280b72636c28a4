// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared setup for the scenario specs.

use lw_core::{ObjId, ParamKind, ParamValue, Pointer, Protocol};
use lw_exec::FakeLauncher;
use lw_project::{KindDef, Project, ProjectOptions, Registry};
use std::sync::Arc;

pub use lw_core::{RunMode, Status};
pub use lw_exec::launch::FakeLaunchCall;

pub struct TestProject {
    // Keeps the on-disk project alive for the test
    #[allow(dead_code)]
    pub dir: tempfile::TempDir,
    pub project: Project,
    pub launcher: Arc<FakeLauncher>,
}

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(
        KindDef::new("ProtImportMovies", "import movies")
            .streaming()
            .param_default("samplingRate", ParamKind::Scalar, "1.0"),
    );
    registry.register(
        KindDef::new("ProtAlignMovies", "align movies").param("inputMovies", ParamKind::Pointer),
    );
    registry
        .register(KindDef::new("ProtCtf", "estimate ctf").param("inputMics", ParamKind::Pointer));
    registry
}

pub fn project() -> TestProject {
    let dir = tempfile::tempdir().expect("tempdir");
    let launcher = Arc::new(FakeLauncher::new());
    let project = Project::create(
        dir.path().join("proj"),
        registry(),
        ProjectOptions::new(launcher.clone()),
    )
    .expect("create project");
    TestProject { dir, project, launcher }
}

/// Saved chain import → align → ctf with registered outputs.
pub fn chain(t: &mut TestProject) -> (Protocol, Protocol, Protocol) {
    let p = &mut t.project;

    let mut a = p.new_protocol("ProtImportMovies").expect("new import");
    p.save_protocol(&mut a).expect("save import");
    p.register_output(&mut a, "outputMovies", "SetOfMovies", true)
        .expect("output a");

    let mut b = p.new_protocol("ProtAlignMovies").expect("new align");
    set_pointer(&mut b, "inputMovies", a.id, "outputMovies");
    p.save_protocol(&mut b).expect("save align");
    p.register_output(&mut b, "outputMicrographs", "SetOfMicrographs", false)
        .expect("output b");

    let mut c = p.new_protocol("ProtCtf").expect("new ctf");
    set_pointer(&mut c, "inputMics", b.id, "outputMicrographs");
    p.save_protocol(&mut c).expect("save ctf");

    (a, b, c)
}

pub fn set_pointer(prot: &mut Protocol, name: &str, target: ObjId, out_key: &str) {
    prot.inputs.insert(
        name.to_string(),
        ParamValue::pointer(Pointer::with_extended(target, out_key)),
    );
}
