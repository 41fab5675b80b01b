//! Task definitions and the task registry.
//!
//! Tasks are named, repeatable units of work (clean, assemble, ...)
//! bound to an opaque action. A task is either root-scoped (runs exactly
//! once) or per-module (instantiated once per module in the graph).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Context handed to an action when its unit runs.
///
/// Carries the unit's identity and resolved output directory; the action
/// itself takes no other input beyond what its closure captured.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Name of the task being executed.
    pub task: String,
    /// Module the unit applies to, or None for root-scoped tasks.
    pub module: Option<String>,
    /// Resolved output directory for the unit.
    pub output_dir: PathBuf,
}

/// An opaque task action: succeeds or fails with a reason.
///
/// Actions are external collaborators (file deletion, compiler
/// invocation); this layer imposes no timeout and no retry.
pub type Action = Arc<dyn Fn(&ActionContext) -> std::result::Result<(), String> + Send + Sync>;

/// Scope of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    /// The task runs exactly once, against the root build directory.
    Root,
    /// The task is instantiated once per module, in topological order.
    PerModule,
}

impl std::fmt::Display for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskScope::Root => write!(f, "root"),
            TaskScope::PerModule => write!(f, "per_module"),
        }
    }
}

/// A registered task definition.
///
/// Registered once before scheduling and not mutated during execution.
#[derive(Clone)]
pub struct TaskDef {
    /// Unique task name.
    pub name: String,
    /// Whether the task runs once or per module.
    pub scope: TaskScope,
    /// The action executed for each unit of this task.
    pub action: Action,
    /// Names of tasks whose units must fully complete before this task's
    /// units run (on the unit's module and its dependency chain).
    pub depends_on: Vec<String>,
}

impl TaskDef {
    /// Create a task definition with no ordering constraints.
    pub fn new(name: &str, scope: TaskScope, action: Action) -> Self {
        Self {
            name: name.to_string(),
            scope,
            action,
            depends_on: Vec::new(),
        }
    }

    /// Add task-level ordering constraints.
    pub fn with_depends_on(mut self, depends_on: &[String]) -> Self {
        self.depends_on = depends_on.to_vec();
        self
    }
}

impl std::fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDef")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

/// Registry of named task definitions.
///
/// Registration order is preserved for deterministic iteration.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<TaskDef>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Register a task definition.
    ///
    /// # Errors
    /// Returns `DuplicateTask` on re-registration of the same name; the
    /// registry is unchanged on failure.
    pub fn register(&mut self, def: TaskDef) -> Result<()> {
        if self.tasks.iter().any(|t| t.name == def.name) {
            return Err(Error::DuplicateTask(def.name));
        }
        self.tasks.push(def);
        Ok(())
    }

    /// Look up a task by name.
    ///
    /// # Errors
    /// Returns `UnknownTask` if absent.
    pub fn lookup(&self, name: &str) -> Result<&TaskDef> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTask(name.to_string()))
    }

    /// Check whether a task is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A no-op action that always succeeds. Useful for wiring and tests.
pub fn noop_action() -> Action {
    Arc::new(|_ctx| Ok(()))
}
