//! Plan computation from real manifests on disk.

use crate::fixtures::{chain_project, TestProject};
use kiln::exec::plan;
use kiln::Error;

fn tasks(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_plan_orders_modules_dependency_first() {
    let project = chain_project();
    let (graph, registry, mut resolver) = project.load();

    let plan = plan(&graph, &registry, &mut resolver, &tasks(&["assemble"])).unwrap();

    let labels: Vec<String> = plan.units().iter().map(|u| u.label()).collect();
    assert_eq!(
        labels,
        vec!["assemble(core)", "assemble(lib)", "assemble(app)"]
    );
}

#[test]
fn test_plan_root_task_single_unit_at_build_root() {
    let project = chain_project();
    let (graph, registry, mut resolver) = project.load();

    let plan = plan(&graph, &registry, &mut resolver, &tasks(&["clean"])).unwrap();

    assert_eq!(plan.len(), 1);
    let unit = &plan.units()[0];
    assert!(unit.module.is_none());
    assert_eq!(unit.output_dir, project.build_root());
}

#[test]
fn test_plan_output_dirs_are_per_module() {
    let project = chain_project();
    let (graph, registry, mut resolver) = project.load();

    let plan = plan(&graph, &registry, &mut resolver, &tasks(&["assemble"])).unwrap();

    let root = project.build_root();
    for unit in plan.units() {
        let module = unit.module.as_deref().unwrap();
        assert_eq!(unit.output_dir, root.join(module));
    }
}

#[test]
fn test_plan_unknown_task_from_cli_name() {
    let project = chain_project();
    let (graph, registry, mut resolver) = project.load();

    let err = plan(&graph, &registry, &mut resolver, &tasks(&["deploy"])).unwrap_err();
    assert!(matches!(err, Error::UnknownTask(name) if name == "deploy"));
}

#[test]
fn test_manifest_cycle_is_named() {
    let project = TestProject::new(
        r#"
[[module]]
name = "a"
deps = ["b"]

[[module]]
name = "b"
deps = ["a"]
"#,
    );
    let manifest = kiln::Manifest::load(&project.manifest_path).unwrap();
    let err = manifest.build_graph().unwrap_err();
    match err {
        Error::CyclicDependency { cycle } => {
            assert!(cycle.contains("a") && cycle.contains("b"));
            assert!(cycle.contains("->"));
        }
        other => panic!("Expected CyclicDependency, got {:?}", other),
    }
}

#[test]
fn test_depends_on_pulls_task_into_plan() {
    let project = TestProject::new(
        r#"
[[module]]
name = "app"

[[task]]
name = "compile"
scope = "per_module"
kind = "command"
command = "true"

[[task]]
name = "test"
scope = "per_module"
kind = "command"
command = "true"
depends_on = ["compile"]
"#,
    );
    let (graph, registry, mut resolver) = project.load();

    // Requesting only "test" still plans "compile" first
    let plan = plan(&graph, &registry, &mut resolver, &tasks(&["test"])).unwrap();
    let labels: Vec<String> = plan.units().iter().map(|u| u.label()).collect();
    assert_eq!(labels, vec!["compile(app)", "test(app)"]);
}

#[test]
fn test_evaluation_depends_on_orders_modules() {
    let project = TestProject::new(
        r#"
[[module]]
name = "feature"
evaluation_depends_on = ["platform"]

[[module]]
name = "platform"

[[task]]
name = "assemble"
scope = "per_module"
kind = "command"
command = "true"
"#,
    );
    let (graph, registry, mut resolver) = project.load();

    let plan = plan(&graph, &registry, &mut resolver, &tasks(&["assemble"])).unwrap();
    let labels: Vec<String> = plan.units().iter().map(|u| u.label()).collect();
    assert_eq!(labels, vec!["assemble(platform)", "assemble(feature)"]);
}

#[test]
fn test_plan_json_round_trip() {
    let project = chain_project();
    let (graph, registry, mut resolver) = project.load();

    let plan = plan(
        &graph,
        &registry,
        &mut resolver,
        &tasks(&["clean", "assemble"]),
    )
    .unwrap();

    let json = serde_json::to_string(&plan).unwrap();
    let parsed: kiln::ExecutionPlan = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), plan.len());
    let labels: Vec<String> = parsed.units().iter().map(|u| u.label()).collect();
    let original: Vec<String> = plan.units().iter().map(|u| u.label()).collect();
    assert_eq!(labels, original);
}
