//! Test fixtures for integration tests.
//!
//! Provides helpers for creating temporary projects with a `kiln.toml`
//! manifest and for loading them into the scheduler's input model.

use std::path::PathBuf;
use tempfile::TempDir;

use kiln::config::Manifest;
use kiln::core::{ModuleGraph, OutputPathResolver, TaskRegistry};

/// A test project: a temporary directory with a manifest written to it.
pub struct TestProject {
    /// Keeps the directory alive for the duration of the test.
    pub temp_dir: TempDir,
    /// Path to the manifest inside the directory.
    pub manifest_path: PathBuf,
}

impl TestProject {
    /// Create a project directory containing the given manifest text.
    pub fn new(manifest: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let manifest_path = temp_dir.path().join("kiln.toml");
        std::fs::write(&manifest_path, manifest).expect("Failed to write manifest");
        Self {
            temp_dir,
            manifest_path,
        }
    }

    /// Load the manifest and materialize the scheduler inputs.
    pub fn load(&self) -> (ModuleGraph, TaskRegistry, OutputPathResolver) {
        let manifest = Manifest::load(&self.manifest_path).expect("Failed to load manifest");
        let graph = manifest.build_graph().expect("Failed to build graph");
        let registry = manifest.build_registry().expect("Failed to build registry");
        let resolver = OutputPathResolver::new(manifest.build_root(&self.manifest_path));
        (graph, registry, resolver)
    }

    /// The build output root for this project's manifest.
    pub fn build_root(&self) -> PathBuf {
        let manifest = Manifest::load(&self.manifest_path).expect("Failed to load manifest");
        manifest.build_root(&self.manifest_path)
    }
}

/// A three-module project (core <- lib <- app) with clean and assemble
/// tasks, where assemble drops a marker file into its output directory.
pub fn chain_project() -> TestProject {
    TestProject::new(
        r#"
build_dir = "build"

[[module]]
name = "core"

[[module]]
name = "lib"
deps = ["core"]

[[module]]
name = "app"
deps = ["lib"]

[[task]]
name = "clean"
scope = "root"
kind = "clean"

[[task]]
name = "assemble"
scope = "per_module"
kind = "command"
command = "touch \"$KILN_OUTPUT_DIR/artifact\""
"#,
    )
}
