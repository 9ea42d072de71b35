//! Scheduler driving the deployment graph.
//!
//! The scheduler walks the task graph and dispatches every task whose
//! dependencies are Done. In concurrent mode all ready tasks are spawned
//! before any is joined, so independent steps overlap; in sequential mode
//! exactly one task is launched and awaited at a time, in document order.
//! Every spawned task is joined before the run finishes.

use crate::config::RunConfig;
use crate::core::graph::TaskGraph;
use crate::core::task::{Task, TaskResult};
use crate::error::{Error, Result};
use crate::orchestration::runner::CommandRunner;
use crate::{clog, clog_warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Events emitted for task lifecycle changes.
///
/// These let the caller report progress (and tests observe ordering)
/// without polling the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A task was dispatched and its child process is starting.
    TaskStarted {
        /// Name of the dispatched task.
        name: String,
    },
    /// A task finished, successfully or not.
    TaskFinished {
        /// The outcome, including exit code and timing.
        result: TaskResult,
    },
    /// Every task in the graph is Done.
    AllComplete,
}

/// Scheduler for deployment task execution.
///
/// Owns the graph and a shared [`CommandRunner`]. Task failures (non-zero
/// exits) are recorded and, by default, do not stop the pipeline; with
/// `continue_on_failure` off the scheduler stops dispatching after the
/// first failure, drains in-flight tasks, and returns `Error::TaskFailed`.
pub struct Scheduler {
    graph: TaskGraph,
    runner: Arc<CommandRunner>,
    config: RunConfig,
    event_tx: mpsc::Sender<SchedulerEvent>,
    completed: HashSet<String>,
    results: Vec<TaskResult>,
}

impl Scheduler {
    pub fn new(
        graph: TaskGraph,
        runner: CommandRunner,
        config: RunConfig,
        event_tx: mpsc::Sender<SchedulerEvent>,
    ) -> Self {
        Self {
            graph,
            runner: Arc::new(runner),
            config,
            event_tx,
            completed: HashSet::new(),
            results: Vec::new(),
        }
    }

    /// Names of tasks that have finished.
    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    /// The graph, for inspecting task statuses after a run.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run the pipeline to completion.
    ///
    /// Returns the results of every task that ran, in completion order.
    ///
    /// # Errors
    ///
    /// Returns an error on an internal fault (spawn failure, join panic) or
    /// when a task fails with `continue_on_failure` disabled.
    pub async fn run(&mut self) -> Result<Vec<TaskResult>> {
        clog!(
            "Scheduler starting: {} tasks, sequential={}, continue_on_failure={}",
            self.graph.task_count(),
            self.config.sequential,
            self.config.continue_on_failure
        );

        if self.config.sequential {
            self.run_sequential().await?;
        } else {
            self.run_concurrent().await?;
        }

        let _ = self.event_tx.send(SchedulerEvent::AllComplete).await;
        clog!("Scheduler finished: {} results", self.results.len());
        Ok(std::mem::take(&mut self.results))
    }

    /// One task at a time: launch the first ready task in document order and
    /// await it immediately.
    async fn run_sequential(&mut self) -> Result<()> {
        while !self.graph.all_complete(&self.completed) {
            let next = self
                .graph
                .ready_tasks(&self.completed)
                .into_iter()
                .find(|t| t.is_pending())
                .cloned();

            // No runnable work left; cannot happen in an acyclic graph with
            // pending tasks, but exiting beats spinning.
            let Some(task) = next else { break };

            self.graph.start_task(&task.name)?;
            let _ = self
                .event_tx
                .send(SchedulerEvent::TaskStarted {
                    name: task.name.clone(),
                })
                .await;

            let result = self.runner.run(&task).await?;
            let name = result.name.clone();
            let exit_code = result.exit_code;
            if self.record_result(result).await? {
                return Err(Error::TaskFailed { name, exit_code });
            }
        }
        Ok(())
    }

    /// Spawn every ready task, then join them one at a time, re-scanning
    /// readiness after each join.
    async fn run_concurrent(&mut self) -> Result<()> {
        let mut inflight: JoinSet<Result<TaskResult>> = JoinSet::new();
        let mut abort: Option<Error> = None;

        loop {
            if abort.is_none() {
                if self.graph.all_complete(&self.completed) {
                    break;
                }
                self.dispatch_ready(&mut inflight).await?;
            }

            match inflight.join_next().await {
                Some(joined) => {
                    let result = joined.map_err(|e| Error::TaskJoin(e.to_string()))??;
                    let name = result.name.clone();
                    let exit_code = result.exit_code;
                    if self.record_result(result).await? && abort.is_none() {
                        abort = Some(Error::TaskFailed { name, exit_code });
                    }
                }
                // Nothing in flight: all complete, aborted and drained, or
                // no runnable work left.
                None => break,
            }
        }

        match abort {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Spawn all pending tasks whose dependencies are Done.
    async fn dispatch_ready(&mut self, inflight: &mut JoinSet<Result<TaskResult>>) -> Result<()> {
        let ready: Vec<Task> = self
            .graph
            .ready_tasks(&self.completed)
            .into_iter()
            .filter(|t| t.is_pending())
            .cloned()
            .collect();

        for task in ready {
            self.graph.start_task(&task.name)?;
            clog!("Dispatching {}", task.name);
            let _ = self
                .event_tx
                .send(SchedulerEvent::TaskStarted {
                    name: task.name.clone(),
                })
                .await;

            let runner = Arc::clone(&self.runner);
            inflight.spawn(async move { runner.run(&task).await });
        }

        Ok(())
    }

    /// Record a finished task. Returns true when the failure should abort
    /// the run.
    async fn record_result(&mut self, result: TaskResult) -> Result<bool> {
        if !result.succeeded {
            clog_warn!(
                "Task {} exited non-zero (code {})",
                result.name,
                result.exit_code
            );
        } else {
            clog!("Task {} finished ok", result.name);
        }

        if self.config.verbosity.progress() {
            println!("{} complete", result.name);
        }

        self.graph.complete_task(&result.name)?;
        self.completed.insert(result.name.clone());

        let abort = !result.succeeded && !self.config.continue_on_failure;

        let _ = self
            .event_tx
            .send(SchedulerEvent::TaskFinished {
                result: result.clone(),
            })
            .await;
        self.results.push(result);

        Ok(abort)
    }
}
