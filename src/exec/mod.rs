//! Planning and execution: plan computation, the scheduler state
//! machine, and the parallel worker pool.

pub mod parallel;
pub mod plan;
pub mod scheduler;

pub use parallel::ParallelExecutor;
pub use plan::{plan, ExecUnit, ExecutionPlan};
pub use scheduler::{ExecutionReport, Scheduler, SchedulerState};
