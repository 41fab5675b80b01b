pub mod config;
pub mod core;
pub mod error;
pub mod exec;
pub mod log;

pub use config::Manifest;
pub use core::{ModuleGraph, OutputPathResolver, TaskDef, TaskRegistry, TaskScope};
pub use error::{Error, Result};
pub use exec::{ExecutionPlan, ParallelExecutor, Scheduler, SchedulerState};
