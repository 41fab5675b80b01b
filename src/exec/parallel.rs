//! Parallel plan execution across independent branches.
//!
//! The parallel executor runs plan units on a bounded worker pool while
//! honoring the plan's dependency edges. Guarantees:
//! - units for the same module never run concurrently,
//! - a unit starts only after every unit it depends on has completed,
//! - the first failure cancels all not-yet-started units, in-flight
//!   units drain, and the failure is reported after the drain.
//!
//! Actions run on `spawn_blocking` since they are synchronous external
//! collaborators (file deletion, compiler invocation).

use crate::core::task::{ActionContext, TaskRegistry};
use crate::error::{Error, Result};
use crate::exec::plan::ExecutionPlan;
use crate::exec::scheduler::ExecutionReport;
use crate::{klog_debug, klog_error, klog_warn};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outcome message from a worker: unit index plus the action result.
type UnitOutcome = (usize, std::result::Result<(), String>);

/// Executes an ExecutionPlan concurrently on a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    max_workers: usize,
}

impl ParallelExecutor {
    /// Create an executor with the given worker capacity (minimum 1).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Worker capacity.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Execute the plan, dispatching ready units up to capacity.
    ///
    /// # Errors
    /// Returns the first `ActionExecution` failure after in-flight units
    /// have drained.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        registry: &TaskRegistry,
    ) -> Result<ExecutionReport> {
        let total = plan.len();
        if total == 0 {
            return Ok(ExecutionReport { completed: Vec::new() });
        }

        let deps: Vec<Vec<usize>> = (0..total).map(|i| plan.deps_of(i)).collect();
        let (tx, mut rx) = mpsc::channel::<UnitOutcome>(total);
        let cancel = CancellationToken::new();

        let mut completed: HashSet<usize> = HashSet::new();
        let mut completion_order: Vec<usize> = Vec::new();
        let mut running: HashSet<usize> = HashSet::new();
        // Module occupancy: units for the same module (or the root) are
        // mutually exclusive.
        let mut busy_modules: HashMap<Option<String>, usize> = HashMap::new();
        let mut first_failure: Option<Error> = None;

        loop {
            if !cancel.is_cancelled() {
                for i in 0..total {
                    if running.len() >= self.max_workers {
                        break;
                    }
                    if completed.contains(&i) || running.contains(&i) {
                        continue;
                    }
                    let unit = &plan.units()[i];
                    if busy_modules.contains_key(&unit.module) {
                        continue;
                    }
                    if !deps[i].iter().all(|d| completed.contains(d)) {
                        continue;
                    }

                    let def = registry.lookup(&unit.task)?;
                    let action = def.action.clone();
                    let ctx = ActionContext {
                        task: unit.task.clone(),
                        module: unit.module.clone(),
                        output_dir: unit.output_dir.clone(),
                    };
                    let tx = tx.clone();
                    klog_debug!("Dispatching {}", unit.label());
                    running.insert(i);
                    busy_modules.insert(unit.module.clone(), i);
                    tokio::spawn(async move {
                        let outcome = tokio::task::spawn_blocking(move || action(&ctx))
                            .await
                            .unwrap_or_else(|e| Err(format!("worker panicked: {}", e)));
                        let _ = tx.send((i, outcome)).await;
                    });
                }
            }

            if completed.len() == total {
                break;
            }
            if running.is_empty() {
                // Either cancelled with nothing left in flight, or no
                // further unit can become ready.
                break;
            }

            let Some((i, outcome)) = rx.recv().await else {
                return Err(Error::WorkerJoin("result channel closed".to_string()));
            };
            running.remove(&i);
            let unit = &plan.units()[i];
            busy_modules.remove(&unit.module);

            match outcome {
                Ok(()) => {
                    completed.insert(i);
                    completion_order.push(i);
                }
                Err(reason) => {
                    klog_error!("Unit {} failed: {}", unit.label(), reason);
                    if first_failure.is_none() {
                        first_failure = Some(Error::ActionExecution {
                            task: unit.task.clone(),
                            module: unit.module.clone(),
                            reason,
                        });
                    }
                    if !cancel.is_cancelled() {
                        // Everything not completed, not in flight, and not
                        // the unit that just failed is still pending.
                        klog_warn!(
                            "Cancelling {} pending unit(s), draining {} in flight",
                            total - completed.len() - running.len() - 1,
                            running.len()
                        );
                        // Stop dispatching; in-flight units drain via recv.
                        cancel.cancel();
                    }
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err);
        }
        Ok(ExecutionReport {
            completed: completion_order
                .into_iter()
                .map(|i| plan.units()[i].clone())
                .collect(),
        })
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
