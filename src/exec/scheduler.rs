//! Scheduler driving planning and sequential execution.
//!
//! The Scheduler owns the state machine
//! `Idle -> Planned -> Executing -> {Completed | Failed}`. Planning is
//! fail-closed: every constraint error is detected before any action
//! runs. Execution is fail-fast: the first action failure halts the plan
//! and already-applied side effects are not rolled back (actions are
//! assumed idempotent, clean/assemble-style).

use crate::core::module::ModuleGraph;
use crate::core::paths::OutputPathResolver;
use crate::core::task::{ActionContext, TaskRegistry};
use crate::error::{Error, Result};
use crate::exec::plan::{plan as build_plan, ExecUnit, ExecutionPlan};
use crate::{klog_debug, klog_error};

/// Lifecycle state of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No plan computed yet.
    Idle,
    /// A plan is ready to execute.
    Planned,
    /// The plan is running.
    Executing,
    /// Every unit completed successfully.
    Completed,
    /// A unit failed; execution halted.
    Failed,
}

impl SchedulerState {
    fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Planned => "planned",
            SchedulerState::Executing => "executing",
            SchedulerState::Completed => "completed",
            SchedulerState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Units that completed, in execution order.
    pub completed: Vec<ExecUnit>,
}

/// Plans and executes build tasks against a module graph and registry.
pub struct Scheduler<'a> {
    graph: &'a ModuleGraph,
    registry: &'a TaskRegistry,
    resolver: OutputPathResolver,
    state: SchedulerState,
    plan: Option<ExecutionPlan>,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler in the Idle state.
    pub fn new(graph: &'a ModuleGraph, registry: &'a TaskRegistry, resolver: OutputPathResolver) -> Self {
        Self {
            graph,
            registry,
            resolver,
            state: SchedulerState::Idle,
            plan: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The computed plan, if any.
    pub fn plan(&self) -> Option<&ExecutionPlan> {
        self.plan.as_ref()
    }

    /// Build the execution plan for the requested tasks.
    ///
    /// Transitions Idle -> Planned; on error the scheduler stays Idle
    /// with no plan and no side effects.
    ///
    /// # Errors
    /// Planning errors (`UnknownTask`, `CyclicDependency`,
    /// `UnsatisfiableOrdering`, ...) propagate unchanged.
    pub fn build_plan(&mut self, requested: &[String]) -> Result<&ExecutionPlan> {
        if self.state != SchedulerState::Idle {
            return Err(Error::InvalidSchedulerState {
                state: self.state.as_str(),
                expected: "idle",
            });
        }
        let plan = build_plan(self.graph, self.registry, &mut self.resolver, requested)?;
        klog_debug!("Planned {} unit(s): {:?}", plan.len(), plan.units().iter().map(ExecUnit::label).collect::<Vec<_>>());
        self.plan = Some(plan);
        self.state = SchedulerState::Planned;
        Ok(self.plan.as_ref().expect("plan just stored"))
    }

    /// Execute the plan sequentially, in order, fail-fast.
    ///
    /// Transitions Planned -> Executing -> Completed, or -> Failed on the
    /// first action error, which is reported with the failing unit's
    /// identity. Completed units are never rolled back.
    pub fn execute(&mut self) -> Result<ExecutionReport> {
        if self.state != SchedulerState::Planned {
            return Err(Error::InvalidSchedulerState {
                state: self.state.as_str(),
                expected: "planned",
            });
        }
        let plan = self.plan.take().expect("Planned state implies a plan");
        self.state = SchedulerState::Executing;

        let mut completed = Vec::with_capacity(plan.len());
        for unit in plan.units() {
            klog_debug!("Executing {}", unit.label());
            let def = self.registry.lookup(&unit.task)?;
            let ctx = ActionContext {
                task: unit.task.clone(),
                module: unit.module.clone(),
                output_dir: unit.output_dir.clone(),
            };
            if let Err(reason) = (def.action)(&ctx) {
                klog_error!("Unit {} failed: {}", unit.label(), reason);
                self.state = SchedulerState::Failed;
                return Err(Error::ActionExecution {
                    task: unit.task.clone(),
                    module: unit.module.clone(),
                    reason,
                });
            }
            completed.push(unit.clone());
        }

        self.state = SchedulerState::Completed;
        Ok(ExecutionReport { completed })
    }
}

impl std::fmt::Debug for Scheduler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("planned_units", &self.plan.as_ref().map(ExecutionPlan::len))
            .finish()
    }
}
