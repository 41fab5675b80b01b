//! Build manifest loading (`kiln.toml`).
//!
//! The manifest declares the module graph and the task set for a
//! project. `Manifest::build` turns it into the in-memory model the
//! scheduler runs against.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::core::module::{EdgeKind, ModuleGraph};
use crate::core::task::{Action, TaskDef, TaskRegistry, TaskScope};
use crate::{klog_debug, Error, Result};

fn default_build_dir() -> String {
    "build".to_string()
}

/// One `[[module]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    #[serde(default)]
    pub deps: Vec<String>,
    /// Modules whose configuration must settle before this one; folded
    /// into the ordering edges of the graph.
    #[serde(default)]
    pub evaluation_depends_on: Vec<String>,
}

/// What a `[[task]]` entry does when its units run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Delete the unit's output directory (missing is success).
    Clean,
    /// Run a shell command with the output directory prepared.
    Command,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub name: String,
    pub scope: TaskScope,
    pub kind: TaskKind,
    /// Shell command line, required for `kind = "command"`.
    pub command: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A parsed `kiln.toml` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    /// Build output root, relative to the manifest's directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        klog_debug!("Manifest::load path={}", path.display());
        let manifest: Self = toml::from_str(&fs::read_to_string(path)?)?;
        klog_debug!(
            "Manifest loaded: {} module(s), {} task(s), build_dir={}",
            manifest.modules.len(),
            manifest.tasks.len(),
            manifest.build_dir
        );
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for task in &self.tasks {
            if task.kind == TaskKind::Command && task.command.is_none() {
                return Err(Error::Manifest(format!(
                    "task '{}' has kind = \"command\" but no command line",
                    task.name
                )));
            }
        }
        Ok(())
    }

    /// Build output root for a manifest located at `manifest_path`.
    pub fn build_root(&self, manifest_path: &Path) -> PathBuf {
        let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        dir.join(&self.build_dir)
    }

    /// Materialize the module graph from the manifest.
    ///
    /// Modules are declared first so deps may reference entries in any
    /// order; `evaluation_depends_on` becomes ordering edges.
    pub fn build_graph(&self) -> Result<ModuleGraph> {
        let mut graph = ModuleGraph::new();
        for module in &self.modules {
            graph.declare(&module.name)?;
        }
        for module in &self.modules {
            graph.link(&module.name, &module.deps, EdgeKind::Dependency)?;
            graph.link(
                &module.name,
                &module.evaluation_depends_on,
                EdgeKind::Ordering,
            )?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Materialize the task registry from the manifest.
    pub fn build_registry(&self) -> Result<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        for task in &self.tasks {
            let action = match task.kind {
                TaskKind::Clean => clean_action(),
                TaskKind::Command => {
                    let line = task.command.clone().ok_or_else(|| {
                        Error::Manifest(format!("task '{}' has no command line", task.name))
                    })?;
                    command_action(line)
                }
            };
            registry.register(
                TaskDef::new(&task.name, task.scope, action).with_depends_on(&task.depends_on),
            )?;
        }
        Ok(registry)
    }
}

/// Action that removes the unit's output directory.
pub fn clean_action() -> Action {
    Arc::new(|ctx| match fs::remove_dir_all(&ctx.output_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!(
            "failed to remove {}: {}",
            ctx.output_dir.display(),
            e
        )),
    })
}

/// Action that runs `sh -c <line>` with the output directory created
/// beforehand and exported as `KILN_OUTPUT_DIR` (plus `KILN_TASK` and
/// `KILN_MODULE`).
pub fn command_action(line: String) -> Action {
    Arc::new(move |ctx| {
        fs::create_dir_all(&ctx.output_dir)
            .map_err(|e| format!("failed to create {}: {}", ctx.output_dir.display(), e))?;
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&line)
            .env("KILN_TASK", &ctx.task)
            .env("KILN_OUTPUT_DIR", &ctx.output_dir);
        if let Some(module) = &ctx.module {
            cmd.env("KILN_MODULE", module);
        }
        let status = cmd.status().map_err(|e| format!("failed to spawn sh: {}", e))?;
        if status.success() {
            Ok(())
        } else {
            Err(match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            })
        }
    })
}
