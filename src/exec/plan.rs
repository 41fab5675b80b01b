//! Execution planning: expanding requested tasks into an ordered plan.
//!
//! The planner turns (module graph, task registry, requested task names)
//! into an ExecutionPlan: a fully ordered, validated sequence of
//! (task, module) units plus the dependency edges between them. Planning
//! detects every constraint error before any action runs.

use crate::core::module::ModuleGraph;
use crate::core::paths::OutputPathResolver;
use crate::core::task::{TaskRegistry, TaskScope};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// A single schedulable unit: one task applied to one module (or to the
/// build root for root-scoped tasks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecUnit {
    /// Name of the task.
    pub task: String,
    /// Module the unit applies to; None for root-scoped tasks.
    pub module: Option<String>,
    /// Resolved output directory for the unit.
    pub output_dir: PathBuf,
}

impl ExecUnit {
    /// Human-readable unit identity, e.g. "assemble(app)" or "clean".
    pub fn label(&self) -> String {
        match &self.module {
            Some(module) => format!("{}({})", self.task, module),
            None => self.task.clone(),
        }
    }
}

impl std::fmt::Display for ExecUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The fully ordered, validated sequence of units ready to run.
///
/// Immutable once computed. `units` is a valid sequential execution
/// order; `edges` preserves the underlying dependency structure so the
/// parallel executor can run independent branches concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    units: Vec<ExecUnit>,
    /// Edges (from, to): unit `from` must complete before unit `to` starts.
    edges: Vec<(usize, usize)>,
}

impl ExecutionPlan {
    /// The units in execution order.
    pub fn units(&self) -> &[ExecUnit] {
        &self.units
    }

    /// Number of units in the plan.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Indices of units that must complete before the given unit.
    pub fn deps_of(&self, unit: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|(_, to)| *to == unit)
            .map(|(from, _)| *from)
            .collect()
    }
}

/// Build an ExecutionPlan for the requested tasks.
///
/// Root-scoped tasks expand to a single unit; per-module tasks expand to
/// one unit per module in topological order. Tasks named in `depends_on`
/// constraints are pulled into the plan ahead of their dependents.
///
/// # Errors
/// - `UnknownTask` if a requested task is not registered
/// - `CyclicDependency` if the module graph is cyclic
/// - `UnsatisfiableOrdering` if the combined constraint graph is cyclic
pub fn plan(
    graph: &ModuleGraph,
    registry: &TaskRegistry,
    resolver: &mut OutputPathResolver,
    requested: &[String],
) -> Result<ExecutionPlan> {
    graph.validate()?;

    let task_order = task_closure(registry, requested)?;
    let module_order: Vec<String> = graph
        .topological_order()?
        .iter()
        .map(|m| m.name.clone())
        .collect();

    // Expand units in deterministic order: tasks in closure order,
    // modules in topological order.
    let mut units: Vec<ExecUnit> = Vec::new();
    let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();
    for task_name in &task_order {
        let def = registry.lookup(task_name)?;
        match def.scope {
            TaskScope::Root => {
                index.insert((task_name.clone(), None), units.len());
                units.push(ExecUnit {
                    task: task_name.clone(),
                    module: None,
                    output_dir: resolver.root().to_path_buf(),
                });
            }
            TaskScope::PerModule => {
                for module in &module_order {
                    index.insert((task_name.clone(), Some(module.clone())), units.len());
                    units.push(ExecUnit {
                        task: task_name.clone(),
                        module: Some(module.clone()),
                        output_dir: resolver.resolve(module)?,
                    });
                }
            }
        }
    }

    // Constraint edges.
    let mut edges: HashSet<(usize, usize)> = HashSet::new();
    for task_name in &task_order {
        let def = registry.lookup(task_name)?;

        // (a) module dependency edges between units of the same
        // per-module task
        if def.scope == TaskScope::PerModule {
            for module in &module_order {
                let to = index[&(task_name.clone(), Some(module.clone()))];
                for dep in graph.direct_deps(module) {
                    let from = index[&(task_name.clone(), Some(dep.to_string()))];
                    edges.insert((from, to));
                }
            }
        }

        // (b) task-level ordering constraints
        for upstream in &def.depends_on {
            let upstream_def = registry.lookup(upstream)?;
            match def.scope {
                TaskScope::PerModule => {
                    for module in &module_order {
                        let to = index[&(task_name.clone(), Some(module.clone()))];
                        match upstream_def.scope {
                            TaskScope::PerModule => {
                                // The upstream task must complete on this
                                // module and its whole dependency chain.
                                let mut chain: Vec<String> = vec![module.clone()];
                                chain.extend(
                                    graph.transitive_deps(module).iter().map(|s| s.to_string()),
                                );
                                for pred in chain {
                                    let from = index[&(upstream.clone(), Some(pred))];
                                    edges.insert((from, to));
                                }
                            }
                            TaskScope::Root => {
                                let from = index[&(upstream.clone(), None)];
                                edges.insert((from, to));
                            }
                        }
                    }
                }
                TaskScope::Root => {
                    let to = index[&(task_name.clone(), None)];
                    for (key, from) in &index {
                        if key.0 == *upstream {
                            edges.insert((*from, to));
                        }
                    }
                }
            }
        }
    }

    order_units(units, edges)
}

/// Resolve the requested tasks plus their depends_on closure, keeping a
/// deterministic order with upstream tasks ahead of their dependents.
/// Cyclic depends_on declarations survive this pass and are rejected by
/// the unit-level cycle check.
fn task_closure(registry: &TaskRegistry, requested: &[String]) -> Result<Vec<String>> {
    fn visit(
        registry: &TaskRegistry,
        name: &str,
        visited: &mut HashSet<String>,
        in_progress: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if visited.contains(name) {
            return Ok(());
        }
        in_progress.insert(name.to_string());
        let def = registry.lookup(name)?;
        for dep in &def.depends_on {
            if !in_progress.contains(dep) {
                visit(registry, dep, visited, in_progress, order)?;
            }
        }
        in_progress.remove(name);
        visited.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    let mut visited = HashSet::new();
    let mut in_progress = HashSet::new();
    let mut order = Vec::new();
    for name in requested {
        visit(registry, name, &mut visited, &mut in_progress, &mut order)?;
    }
    Ok(order)
}

/// Topologically order the units (stable Kahn keyed on insertion index)
/// and remap the edges to the final positions.
fn order_units(units: Vec<ExecUnit>, edges: HashSet<(usize, usize)>) -> Result<ExecutionPlan> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut in_degree = vec![0usize; units.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    for &(from, to) in &edges {
        in_degree[to] += 1;
        successors[from].push(to);
    }

    let mut heap: BinaryHeap<Reverse<usize>> = (0..units.len())
        .filter(|&i| in_degree[i] == 0)
        .map(Reverse)
        .collect();

    let mut order: Vec<usize> = Vec::with_capacity(units.len());
    while let Some(Reverse(i)) = heap.pop() {
        order.push(i);
        for &next in &successors[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                heap.push(Reverse(next));
            }
        }
    }

    if order.len() != units.len() {
        let stuck: Vec<String> = (0..units.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| units[i].label())
            .collect();
        return Err(Error::UnsatisfiableOrdering {
            cycle: stuck.join(", "),
        });
    }

    // Remap unit indices to their final positions.
    let mut position = vec![0usize; units.len()];
    for (pos, &i) in order.iter().enumerate() {
        position[i] = pos;
    }
    let mut ordered_units: Vec<Option<ExecUnit>> = units.into_iter().map(Some).collect();
    let final_units: Vec<ExecUnit> = order
        .iter()
        .map(|&i| ordered_units[i].take().expect("unit consumed once"))
        .collect();
    let mut final_edges: Vec<(usize, usize)> = edges
        .into_iter()
        .map(|(from, to)| (position[from], position[to]))
        .collect();
    final_edges.sort_unstable();

    Ok(ExecutionPlan {
        units: final_units,
        edges: final_edges,
    })
}
