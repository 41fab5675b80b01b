//! Core data model: module graph, output paths, and task definitions.

pub mod module;
pub mod paths;
pub mod task;

pub use module::{EdgeKind, Module, ModuleGraph};
pub use paths::OutputPathResolver;
pub use task::{Action, ActionContext, TaskDef, TaskRegistry, TaskScope};
