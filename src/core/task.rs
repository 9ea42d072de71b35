//! Task data model for the deployment graph.
//!
//! A task is one external command in the deployment pipeline (a `helm`,
//! `kubectl`, or `make` invocation) together with the names of the tasks
//! that must finish before it may start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status in its lifecycle.
///
/// `Done` is terminal and carries no success information: a task that ran
/// and exited non-zero is just as Done as one that exited zero. Success
/// lives in the [`TaskResult`]. There is no retry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    /// Task created, dependencies not yet satisfied or not yet dispatched.
    Pending,
    /// Task dispatched, child process in flight.
    Running,
    /// Task finished, successfully or not.
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

/// A single named command in the deployment graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique name within the graph ("uninstall", "docker-push", ...).
    pub name: String,
    /// Argv to execute; element 0 is the binary.
    pub command: Vec<String>,
    /// Names of tasks that must be Done before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Extra environment for the child process only. The orchestrator's own
    /// environment is never mutated.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Optional precondition argv run immediately before `command` in the
    /// same task slot. Its exit code is ignored (ensure-style commands such
    /// as namespace creation fail benignly when already satisfied).
    #[serde(default)]
    pub pre_command: Option<Vec<String>>,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Create a pending task with the given name and argv.
    pub fn new<I, S>(name: &str, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            command: command.into_iter().map(Into::into).collect(),
            depends_on: Vec::new(),
            env: Vec::new(),
            pre_command: None,
            status: TaskStatus::Pending,
        }
    }

    /// Declare dependencies by task name.
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an environment variable for the child process.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach a precondition command.
    pub fn with_pre_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Transition to Running.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
    }

    /// Transition to Done. Terminal regardless of the child's exit status.
    pub fn finish(&mut self) {
        self.status = TaskStatus::Done;
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// The argv joined for display in progress lines and logs.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Outcome of one task's execution.
///
/// Produced for every task that ran, whether or not it succeeded. A task
/// whose process could not be spawned at all produces an `Error` instead,
/// never a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub name: String,
    /// Child exit code; -1 when the child was killed by a signal.
    pub exit_code: i32,
    pub succeeded: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
