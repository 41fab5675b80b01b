//! Sequential scheduling against real manifests with file side effects.

use crate::fixtures::{chain_project, TestProject};
use kiln::{Error, Scheduler, SchedulerState};

fn tasks(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_assemble_writes_per_module_artifacts() {
    let project = chain_project();
    let (graph, registry, resolver) = project.load();

    let mut scheduler = Scheduler::new(&graph, &registry, resolver);
    scheduler.build_plan(&tasks(&["assemble"])).unwrap();
    let report = scheduler.execute().unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Completed);
    assert_eq!(report.completed.len(), 3);
    let root = project.build_root();
    for module in ["core", "lib", "app"] {
        assert!(root.join(module).join("artifact").is_file());
    }
}

#[test]
fn test_clean_removes_build_root() {
    let project = chain_project();

    // First populate the build directory
    {
        let (graph, registry, resolver) = project.load();
        let mut scheduler = Scheduler::new(&graph, &registry, resolver);
        scheduler.build_plan(&tasks(&["assemble"])).unwrap();
        scheduler.execute().unwrap();
    }
    let root = project.build_root();
    assert!(root.exists());

    let (graph, registry, resolver) = project.load();
    let mut scheduler = Scheduler::new(&graph, &registry, resolver);
    scheduler.build_plan(&tasks(&["clean"])).unwrap();
    scheduler.execute().unwrap();

    assert!(!root.exists());
}

#[test]
fn test_clean_succeeds_when_build_root_missing() {
    let project = chain_project();
    let (graph, registry, resolver) = project.load();

    let mut scheduler = Scheduler::new(&graph, &registry, resolver);
    scheduler.build_plan(&tasks(&["clean"])).unwrap();
    scheduler.execute().unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Completed);
}

#[test]
fn test_failing_command_halts_downstream_modules() {
    let project = TestProject::new(
        r#"
[[module]]
name = "lib"

[[module]]
name = "app"
deps = ["lib"]

[[task]]
name = "assemble"
scope = "per_module"
kind = "command"
command = "if [ \"$KILN_MODULE\" = lib ]; then exit 7; fi; touch \"$KILN_OUTPUT_DIR/artifact\""
"#,
    );
    let (graph, registry, resolver) = project.load();

    let mut scheduler = Scheduler::new(&graph, &registry, resolver);
    scheduler.build_plan(&tasks(&["assemble"])).unwrap();
    let err = scheduler.execute().unwrap_err();

    assert_eq!(scheduler.state(), SchedulerState::Failed);
    match err {
        Error::ActionExecution {
            task,
            module,
            reason,
        } => {
            assert_eq!(task, "assemble");
            assert_eq!(module.as_deref(), Some("lib"));
            assert_eq!(reason, "exit code 7");
        }
        other => panic!("Expected ActionExecution, got {:?}", other),
    }
    // app never ran, so its artifact does not exist
    assert!(!project.build_root().join("app/artifact").exists());
}

#[test]
fn test_clean_then_assemble_in_one_run() {
    let project = TestProject::new(
        r#"
[[module]]
name = "app"

[[task]]
name = "clean"
scope = "root"
kind = "clean"

[[task]]
name = "assemble"
scope = "per_module"
kind = "command"
command = "touch \"$KILN_OUTPUT_DIR/artifact\""
depends_on = ["clean"]
"#,
    );

    // Seed a stale artifact that clean must remove before assemble
    let root = project.build_root();
    std::fs::create_dir_all(root.join("app")).unwrap();
    std::fs::write(root.join("app/stale"), b"old").unwrap();

    let (graph, registry, resolver) = project.load();
    let mut scheduler = Scheduler::new(&graph, &registry, resolver);
    scheduler.build_plan(&tasks(&["clean", "assemble"])).unwrap();
    scheduler.execute().unwrap();

    assert!(!root.join("app/stale").exists());
    assert!(root.join("app/artifact").is_file());
}

#[test]
fn test_duplicate_module_in_manifest() {
    let project = TestProject::new(
        r#"
[[module]]
name = "app"

[[module]]
name = "app"
"#,
    );
    let manifest = kiln::Manifest::load(&project.manifest_path).unwrap();
    assert!(matches!(
        manifest.build_graph(),
        Err(Error::DuplicateModule(name)) if name == "app"
    ));
}
