//! Task graph: declared prerequisites and sequential execution.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::clean::CleanTask;
use crate::error::PipelineError;
use crate::step::TransformStep;

/// Errors in the shape of the task graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Task '{0}' is declared twice")]
    Duplicate(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Cycle detected in task graph involving '{0}'")]
    Cycle(String),

    #[error("Task not found: {0}")]
    UnknownTask(String),
}

/// A node of the graph.
#[derive(Debug)]
pub enum Task {
    Step(TransformStep),
    Clean(CleanTask),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Task::Step(step) => step.name(),
            Task::Clean(clean) => clean.name(),
        }
    }

    /// Run the task, returning the number of files it wrote.
    fn run(&self, root: &Path) -> Result<usize, PipelineError> {
        match self {
            Task::Step(step) => step.run(root).map(|report| report.files),
            Task::Clean(clean) => clean.run(root).map(|_| 0),
        }
    }
}

impl From<TransformStep> for Task {
    fn from(step: TransformStep) -> Self {
        Task::Step(step)
    }
}

impl From<CleanTask> for Task {
    fn from(clean: CleanTask) -> Self {
        Task::Clean(clean)
    }
}

/// Outcome of one task within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub files: usize,
    pub duration_ms: u64,
}

/// Outcome of a whole composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    /// Total files written across all tasks.
    pub fn files(&self) -> usize {
        self.tasks.iter().map(|t| t.files).sum()
    }
}

/// Collects tasks and their prerequisites before validation.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<(Task, Vec<String>)>,
}

impl TaskGraphBuilder {
    /// Declare a task and the names of the tasks that must run before it.
    pub fn task(mut self, task: impl Into<Task>, after: &[&str]) -> Self {
        self.tasks
            .push((task.into(), after.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Validate names, dependencies and acyclicity.
    pub fn build(self) -> Result<TaskGraph, GraphError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut declared = Vec::with_capacity(self.tasks.len());

        for (task, after) in self.tasks {
            let name = task.name().to_string();
            if index.contains_key(&name) {
                return Err(GraphError::Duplicate(name));
            }
            let node = graph.add_node(task);
            index.insert(name.clone(), node);
            declared.push((name, node, after));
        }

        // Edge direction: prerequisite -> dependent.
        for (name, node, after) in &declared {
            for dependency in after {
                if dependency == name {
                    return Err(GraphError::SelfDependency(name.clone()));
                }
                let Some(&dep) = index.get(dependency) else {
                    return Err(GraphError::UnknownDependency {
                        task: name.clone(),
                        dependency: dependency.clone(),
                    });
                };
                graph.add_edge(dep, *node, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let name = graph[cycle.node_id()].name().to_string();
            return Err(GraphError::Cycle(name));
        }

        Ok(TaskGraph { graph, index })
    }
}

/// Static, validated ordering constraints between tasks.
#[derive(Debug)]
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
    index: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    /// Names of all tasks, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|n| self.graph[n].name())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&n| &self.graph[n])
    }

    /// Direct prerequisites of a task, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&str>, GraphError> {
        let node = self.node(name)?;
        Ok(self
            .prerequisites(node)
            .into_iter()
            .map(|n| self.graph[n].name())
            .collect())
    }

    /// Execution order for a composition.
    ///
    /// Targets run in the order given; each target's prerequisites are
    /// expanded depth-first before it, and no task runs twice.
    pub fn plan(&self, targets: &[&str]) -> Result<Vec<&str>, GraphError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();

        for target in targets {
            let node = self.node(target)?;
            self.visit(node, &mut seen, &mut order);
        }

        Ok(order.into_iter().map(|n| self.graph[n].name()).collect())
    }

    /// Run a composition to completion, one task at a time.
    ///
    /// The first failure stops the run; outputs of earlier tasks stay on disk.
    pub fn run(&self, targets: &[&str], root: &Path) -> Result<RunReport, PipelineError> {
        let plan = self.plan(targets)?;
        let mut report = RunReport::default();

        for name in plan {
            let task = self.get(name).ok_or_else(|| GraphError::UnknownTask(name.to_string()))?;

            tracing::info!("Starting '{}'...", name);
            let start = Instant::now();

            let files = task.run(root).inspect_err(|e| {
                tracing::error!("'{}' errored after {}ms", name, start.elapsed().as_millis());
                tracing::debug!("{:?}", e);
            })?;

            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::info!("Finished '{}' after {}ms", name, duration_ms);

            report.tasks.push(TaskReport {
                name: name.to_string(),
                files,
                duration_ms,
            });
        }

        Ok(report)
    }

    fn node(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownTask(name.to_string()))
    }

    fn prerequisites(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<_> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        deps.sort();
        deps
    }

    fn visit(&self, node: NodeIndex, seen: &mut HashSet<NodeIndex>, order: &mut Vec<NodeIndex>) {
        if !seen.insert(node) {
            return;
        }
        for dep in self.prerequisites(node) {
            self.visit(dep, seen, order);
        }
        order.push(node);
    }
}
