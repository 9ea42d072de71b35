//! Task graph for dependency management.
//!
//! The deployment pipeline is a directed acyclic graph of named tasks.
//! Nodes are tasks, edges point from a dependency to the task that waits on
//! it. The graph is a general primitive: it knows nothing about helm or
//! kubectl, only about names, edges, and readiness.

use crate::core::task::Task;
use crate::error::{Error, Result};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// The task dependency graph.
///
/// Backed by petgraph's `DiGraph` with a name-to-node index for lookups.
/// Insertion order is document order; every traversal that has to break a
/// tie does so in insertion order, which is what makes sequential execution
/// deterministic.
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
    name_index: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_index: HashMap::new(),
        }
    }

    /// Build a graph from a task list, wiring each task's `depends_on`
    /// names into edges.
    ///
    /// # Errors
    /// Returns an error if a name appears twice, a dependency names an
    /// unknown task, or the declared dependencies contain a cycle.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self> {
        let mut graph = Self::new();
        for task in &tasks {
            graph.add_task(task.clone())?;
        }
        for task in &tasks {
            for dep in &task.depends_on {
                graph.add_dependency(dep, &task.name)?;
            }
        }
        Ok(graph)
    }

    /// Add a task to the graph.
    ///
    /// Names are the graph's keys; a duplicate name is a planner bug, not a
    /// merge, so it is rejected.
    pub fn add_task(&mut self, task: Task) -> Result<NodeIndex> {
        if self.name_index.contains_key(&task.name) {
            return Err(Error::Validation(format!(
                "Task {} already exists in graph",
                task.name
            )));
        }

        let name = task.name.clone();
        let index = self.graph.add_node(task);
        self.name_index.insert(name, index);
        Ok(index)
    }

    /// Add a dependency: `from` must be Done before `to` may start.
    ///
    /// The edge is validated against cycle introduction and rolled back if
    /// it would create one.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        let from_index = *self
            .name_index
            .get(from)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", from)))?;

        let to_index = *self
            .name_index
            .get(to)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", to)))?;

        let edge = self.graph.add_edge(from_index, to_index, ());

        if is_cyclic_directed(&self.graph) {
            self.graph.remove_edge(edge);
            return Err(Error::Validation(format!(
                "Adding dependency from {} to {} would create a cycle",
                from, to
            )));
        }

        Ok(())
    }

    /// Get a reference to a task by name.
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.name_index
            .get(name)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get a mutable reference to a task by name.
    pub fn get_task_mut(&mut self, name: &str) -> Option<&mut Task> {
        if let Some(&index) = self.name_index.get(name) {
            self.graph.node_weight_mut(index)
        } else {
            None
        }
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_task(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Check if a dependency edge exists between two tasks.
    pub fn has_dependency(&self, from: &str, to: &str) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.name_index.get(from), self.name_index.get(to))
        {
            self.graph.find_edge(from_idx, to_idx).is_some()
        } else {
            false
        }
    }

    /// All tasks not yet Done whose dependencies are all in `completed`,
    /// in insertion (document) order.
    ///
    /// Running tasks are still returned here if their name is absent from
    /// `completed`; the scheduler filters on task status before dispatching.
    pub fn ready_tasks<'a>(&'a self, completed: &HashSet<String>) -> Vec<&'a Task> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let task = self.graph.node_weight(index)?;

                if completed.contains(&task.name) {
                    return None;
                }

                let deps_satisfied = self
                    .graph
                    .neighbors_directed(index, petgraph::Direction::Incoming)
                    .all(|dep_index| {
                        self.graph
                            .node_weight(dep_index)
                            .map(|dep| completed.contains(&dep.name))
                            .unwrap_or(false)
                    });

                if deps_satisfied {
                    Some(task)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Mark a task Running.
    pub fn start_task(&mut self, name: &str) -> Result<()> {
        let task = self
            .get_task_mut(name)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", name)))?;
        task.start();
        Ok(())
    }

    /// Mark a task Done. Terminal regardless of the child's exit status.
    pub fn complete_task(&mut self, name: &str) -> Result<()> {
        let task = self
            .get_task_mut(name)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", name)))?;
        task.finish();
        Ok(())
    }

    /// Check if every task in the graph is in the completed set.
    pub fn all_complete(&self, completed: &HashSet<String>) -> bool {
        self.name_index.keys().all(|name| completed.contains(name))
    }

    /// Count of tasks not in the completed set.
    pub fn pending_count(&self, completed: &HashSet<String>) -> usize {
        self.name_index
            .keys()
            .filter(|name| !completed.contains(*name))
            .count()
    }

    /// Tasks in dependency order, ties broken by insertion order.
    ///
    /// Produced by simulating readiness waves, so the result is exactly the
    /// order sequential execution would run in.
    pub fn topological_order(&self) -> Result<Vec<&Task>> {
        let mut completed: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();

        while !self.all_complete(&completed) {
            let wave: Vec<String> = self
                .ready_tasks(&completed)
                .iter()
                .map(|t| t.name.clone())
                .collect();

            if wave.is_empty() {
                return Err(Error::Validation(
                    "Cycle detected in task graph".to_string(),
                ));
            }

            for name in wave {
                completed.insert(name.clone());
                order.push(name);
            }
        }

        Ok(order.iter().filter_map(|name| self.get_task(name)).collect())
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
