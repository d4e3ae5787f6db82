//! Whole-session behaviour: reflection output, directives per context,
//! pruning and persisted state

mod common;

use common::assertions::{assert_no_references, read_output};
use common::fixtures::*;
use flamework::build::{DefaultValue, LiteralValue, MetaFile};
use flamework::compiler::{meta_path, Batch, Session};
use flamework::symbols::StaticFrontend;

#[test]
fn test_reflective_class_descriptor() {
    let project = Project::new();
    let mut frontend = make_frontend();
    let path = project.source("shared/door.ts");
    let door = make_component(&mut frontend, &path, "Door", vec![make_speed()]);
    frontend.add_file(make_class_file(&path, vec![door]));

    let mut session = project.session(frontend);
    let outcome = session.build_all().unwrap();
    assert_eq!(outcome.exit_code(), 0, "{:?}", outcome.report.diagnostics);

    let meta: MetaFile =
        serde_json::from_str(&read_output(&meta_path(&project.output("shared/door.lua")))).unwrap();
    let descriptor = &meta.descriptors[0];
    assert_eq!(descriptor.id, "shared/door@Door");
    assert!(!descriptor.hash.is_empty());
    assert_eq!(descriptor.properties.len(), 1);
    assert_eq!(descriptor.properties[0].name, "speed");
    assert_eq!(descriptor.properties[0].type_name, "number");
    assert_eq!(
        descriptor.properties[0].default,
        Some(DefaultValue::Literal(LiteralValue::Number(5.0)))
    );

    let lua = read_output(&project.output("shared/door.lua"));
    assert!(lua.contains("Reflect.defineMetadata(Door, \"identifier\", \"shared/door@Door\")"), "{}", lua);
}

#[test]
fn test_guard_clause_per_context() {
    let project = Project::new();
    let mut frontend = make_frontend();
    for dir in ["server", "client", "shared"] {
        let path = project.source(&format!("{}/guard.ts", dir));
        let file = make_guarded_file(&frontend, &path);
        frontend.add_file(file);
    }

    let mut session = project.session(frontend);
    assert_eq!(session.build_all().unwrap().exit_code(), 0);

    let server = read_output(&project.output("server/guard.lua"));
    assert!(server.contains("local function body()\n\treturn\nend\n"), "{}", server);
    assert!(!server.contains("rest()"));

    let client = read_output(&project.output("client/guard.lua"));
    assert!(client.contains("local function body()\n\trest()\nend\n"), "{}", client);

    let shared = read_output(&project.output("shared/guard.lua"));
    assert!(shared.contains("IsServer()"), "{}", shared);
    assert!(shared.contains("rest()"));
}

#[test]
fn test_removed_file_leaves_no_references() {
    let project = Project::new();
    let mut frontend = make_frontend();
    let parts = project.source("shared/parts.ts");
    let base = make_component(&mut frontend, &parts, "Base", vec![]);
    let mut wheel = make_component(&mut frontend, &parts, "Wheel", vec![]);
    wheel.extends = Some(make_global(&frontend, "Base"));
    let lamp_path = project.source("shared/lamp.ts");
    let mut lamp = make_component(&mut frontend, &lamp_path, "Lamp", vec![]);
    lamp.extends = Some(make_global(&frontend, "Base"));
    frontend.add_file(make_class_file(&parts, vec![base, wheel]));
    frontend.add_file(make_class_file(&lamp_path, vec![lamp]));

    let mut session = project.session(frontend);
    session.build_all().unwrap();
    assert!(session.state().references("shared/parts@Wheel"));

    session.frontend_mut().remove_file(&parts).unwrap();
    let report = session
        .compile_batch(&Batch {
            changed: Vec::new(),
            removed: vec![parts],
        })
        .unwrap();
    assert!(report.committed());

    assert_no_references(session.state(), "shared/parts@Base");
    assert_no_references(session.state(), "shared/parts@Wheel");
    assert!(session.state().references("shared/lamp@Lamp"));
    assert!(!project.output("shared/parts.lua").exists());
}

#[test]
fn test_reloaded_state_needs_no_rebuild() {
    let project = Project::new();
    let build = |project: &Project| -> StaticFrontend {
        let mut frontend = make_frontend();
        let path = project.source("shared/door.ts");
        let door = make_component(&mut frontend, &path, "Door", vec![make_speed()]);
        frontend.add_file(make_class_file(&path, vec![door]));
        frontend.add_file(make_plain_file(&project.source("shared/util.ts"), "helper"));
        frontend
    };

    let mut first = project.session(build(&project));
    first.build_all().unwrap();
    let committed = first.state().clone();
    drop(first);

    let mut second: Session<StaticFrontend> = project.session(build(&project));
    assert_eq!(second.state().build, committed.build);
    assert_eq!(second.state().editor, committed.editor);

    let report = second.compile_initial().unwrap();
    let summary = report.summary.unwrap();
    assert!(summary.written.is_empty(), "{:?}", summary.written);
    assert!(summary.pruned.is_empty());
    assert_eq!(second.state().build, committed.build);
}
