//! Module graph for inter-module dependency management.
//!
//! This module provides the ModuleGraph structure that represents the
//! build's modules and their declared dependencies as a directed acyclic
//! graph, enabling deterministic topological ordering of build units.

use crate::error::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Kind of edge between two modules.
///
/// Edges capture why one module must be handled before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// The dependent module consumes the dependency's build output.
    Dependency,
    /// Ordering-only constraint: the other module must be handled first,
    /// but no output flows between them (evaluation_depends_on-style).
    Ordering,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Dependency => write!(f, "dependency"),
            EdgeKind::Ordering => write!(f, "ordering"),
        }
    }
}

/// An independently buildable unit with its own output location.
///
/// Modules are created at graph-construction time from static
/// declarations and are immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Unique module name.
    pub name: String,
    /// Names of modules this module depends on.
    pub deps: Vec<String>,
}

impl Module {
    fn new(name: &str, deps: &[String]) -> Self {
        Self {
            name: name.to_string(),
            deps: deps.to_vec(),
        }
    }
}

/// The module dependency graph.
///
/// ModuleGraph uses petgraph's DiGraph to represent modules and their
/// dependency edges. An edge from A to B means A must be handled before
/// B (B depends on A). Node insertion order doubles as declaration order
/// and is used to break ties deterministically in `topological_order`.
pub struct ModuleGraph {
    /// The underlying directed graph.
    graph: DiGraph<Module, EdgeKind>,
    /// Index mapping from module name to NodeIndex for fast lookups.
    name_index: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    /// Create a new empty ModuleGraph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_index: HashMap::new(),
        }
    }

    /// Add a module together with its dependency edges.
    ///
    /// Dependencies must already be present in the graph; declare modules
    /// in dependency order, or use `declare` followed by `link` for
    /// forward references.
    ///
    /// # Errors
    /// - `DuplicateModule` if the name is already present
    /// - `UnknownDependency` if a referenced dependency has not been added
    pub fn add_module(&mut self, name: &str, deps: &[String]) -> Result<()> {
        if self.name_index.contains_key(name) {
            return Err(Error::DuplicateModule(name.to_string()));
        }

        // Resolve all dependency indexes before mutating anything, so a
        // failed call leaves the graph untouched.
        let mut dep_indexes = Vec::with_capacity(deps.len());
        for dep in deps {
            let index = self
                .name_index
                .get(dep)
                .ok_or_else(|| Error::UnknownDependency {
                    module: name.to_string(),
                    dependency: dep.clone(),
                })?;
            dep_indexes.push(*index);
        }

        let index = self.graph.add_node(Module::new(name, deps));
        self.name_index.insert(name.to_string(), index);
        for dep_index in dep_indexes {
            self.graph.add_edge(dep_index, index, EdgeKind::Dependency);
        }
        Ok(())
    }

    /// Declare a module without dependencies (first pass of declare-then-link).
    pub fn declare(&mut self, name: &str) -> Result<()> {
        if self.name_index.contains_key(name) {
            return Err(Error::DuplicateModule(name.to_string()));
        }
        let index = self.graph.add_node(Module::new(name, &[]));
        self.name_index.insert(name.to_string(), index);
        Ok(())
    }

    /// Link a declared module to its dependencies (second pass).
    ///
    /// Unlike `add_module`, the edges here may reference modules declared
    /// later; cycles introduced by linking are caught by `validate`.
    pub fn link(&mut self, name: &str, deps: &[String], kind: EdgeKind) -> Result<()> {
        let to = *self
            .name_index
            .get(name)
            .ok_or_else(|| Error::UnknownDependency {
                module: name.to_string(),
                dependency: name.to_string(),
            })?;
        let mut dep_indexes = Vec::with_capacity(deps.len());
        for dep in deps {
            let from = self
                .name_index
                .get(dep)
                .ok_or_else(|| Error::UnknownDependency {
                    module: name.to_string(),
                    dependency: dep.clone(),
                })?;
            dep_indexes.push(*from);
        }

        for from in dep_indexes {
            if self.graph.find_edge(from, to).is_none() {
                self.graph.add_edge(from, to, kind);
            }
        }
        if kind == EdgeKind::Dependency {
            if let Some(module) = self.graph.node_weight_mut(to) {
                for dep in deps {
                    if !module.deps.contains(dep) {
                        module.deps.push(dep.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Get a reference to a module by name.
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.name_index
            .get(name)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Check if the graph contains a module.
    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Get the number of modules in the graph.
    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependency edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All module names in declaration order.
    pub fn module_names(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Validate acyclicity with a three-color depth-first traversal.
    ///
    /// # Errors
    /// Returns `CyclicDependency` naming the cycle path if one exists.
    pub fn validate(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors = vec![Color::White; self.graph.node_count()];
        let mut path: Vec<NodeIndex> = Vec::new();

        // Iterative DFS; an Exit frame turns a node black once all of its
        // successors have been visited.
        enum Frame {
            Enter(NodeIndex),
            Exit(NodeIndex),
        }

        for start in self.graph.node_indices() {
            if colors[start.index()] != Color::White {
                continue;
            }
            let mut stack = vec![Frame::Enter(start)];
            while let Some(frame) = stack.pop() {
                match frame {
                    Frame::Enter(node) => {
                        match colors[node.index()] {
                            Color::Black => continue,
                            Color::Gray => continue,
                            Color::White => {}
                        }
                        colors[node.index()] = Color::Gray;
                        path.push(node);
                        stack.push(Frame::Exit(node));
                        for next in self
                            .graph
                            .neighbors_directed(node, petgraph::Direction::Outgoing)
                        {
                            match colors[next.index()] {
                                Color::Gray => {
                                    return Err(Error::CyclicDependency {
                                        cycle: self.format_cycle(&path, next),
                                    });
                                }
                                Color::White => stack.push(Frame::Enter(next)),
                                Color::Black => {}
                            }
                        }
                    }
                    Frame::Exit(node) => {
                        colors[node.index()] = Color::Black;
                        path.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Format the cycle path "a -> b -> a" from the DFS path and the
    /// gray node that closed the loop.
    fn format_cycle(&self, path: &[NodeIndex], back_to: NodeIndex) -> String {
        let start = path.iter().position(|&n| n == back_to).unwrap_or(0);
        let mut names: Vec<&str> = path[start..]
            .iter()
            .filter_map(|&n| self.graph.node_weight(n))
            .map(|m| m.name.as_str())
            .collect();
        if let Some(module) = self.graph.node_weight(back_to) {
            names.push(module.name.as_str());
        }
        names.join(" -> ")
    }

    /// Get modules in topological order (dependencies first).
    ///
    /// Uses Kahn's algorithm with a min-heap keyed on declaration order,
    /// so ties among independent modules always resolve the same way.
    ///
    /// # Errors
    /// Returns `CyclicDependency` if the graph contains a cycle.
    pub fn topological_order(&self) -> Result<Vec<&Module>> {
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;

        let mut in_degree = vec![0usize; self.graph.node_count()];
        for edge in self.graph.edge_indices() {
            if let Some((_, to)) = self.graph.edge_endpoints(edge) {
                in_degree[to.index()] += 1;
            }
        }

        let mut heap: BinaryHeap<Reverse<usize>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(|n| Reverse(n.index()))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(index)) = heap.pop() {
            let node = NodeIndex::new(index);
            if let Some(module) = self.graph.node_weight(node) {
                order.push(module);
            }
            for next in self
                .graph
                .neighbors_directed(node, petgraph::Direction::Outgoing)
            {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    heap.push(Reverse(next.index()));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            // Fall back to the DFS validator for a named cycle path.
            self.validate()?;
            unreachable!("Kahn detected a cycle the DFS validator missed");
        }
        Ok(order)
    }

    /// Direct predecessors of a module, including ordering-only edges.
    pub fn direct_deps(&self, name: &str) -> Vec<&str> {
        let Some(&index) = self.name_index.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, petgraph::Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n))
            .map(|m| m.name.as_str())
            .collect()
    }

    /// All transitive dependencies of a module (its ancestor chain),
    /// including ordering-only edges. Returns names without a guaranteed
    /// order; the empty vec for unknown modules.
    pub fn transitive_deps(&self, name: &str) -> Vec<&str> {
        let Some(&start) = self.name_index.get(name) else {
            return Vec::new();
        };
        let mut seen = vec![false; self.graph.node_count()];
        let mut stack = vec![start];
        let mut result = Vec::new();
        while let Some(node) = stack.pop() {
            for prev in self
                .graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
            {
                if !seen[prev.index()] {
                    seen[prev.index()] = true;
                    stack.push(prev);
                    if let Some(module) = self.graph.node_weight(prev) {
                        result.push(module.name.as_str());
                    }
                }
            }
        }
        result
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleGraph")
            .field("modules", &self.module_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
