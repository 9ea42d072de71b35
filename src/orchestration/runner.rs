//! Child-process execution with verbosity-routed stdio.
//!
//! The runner owns the policy for what a task's child process may write to
//! the terminal. It always waits for full process exit and reports the exit
//! code in a [`TaskResult`]; a non-zero exit is an ordinary result, never an
//! error return. Only a process that cannot be spawned at all surfaces as an
//! `Error`.

use crate::clog_debug;
use crate::config::Verbosity;
use crate::core::task::{Task, TaskResult};
use crate::error::{Error, Result};
use chrono::Utc;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Executes one task's commands with the configured verbosity.
///
/// Routing per level: 0 discards everything, 1 and 2 surface child stderr
/// only, 3 surfaces stdout too. Levels 2 and up additionally print a
/// `Running <argv>` line per command. Child stdin is always null.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    verbosity: Verbosity,
}

impl CommandRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Run a task to completion.
    ///
    /// If the task has a precondition command it runs first with the same
    /// stdio routing; its exit code is logged and ignored (ensure-style
    /// commands fail benignly when already satisfied). The result carries
    /// the main command's exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only when a process cannot be spawned (empty argv,
    /// binary vanished). A task that ran and exited non-zero is an ordinary
    /// `TaskResult` with `succeeded: false`.
    pub async fn run(&self, task: &Task) -> Result<TaskResult> {
        let started_at = Utc::now();

        if let Some(pre) = &task.pre_command {
            if self.verbosity.progress() {
                println!("Running {}", pre.join(" "));
            }
            let status = self.spawn(pre, &task.env).await?;
            clog_debug!(
                "Precondition for {} exited with code {:?}",
                task.name,
                status.code()
            );
        }

        if self.verbosity.progress() {
            println!("Running {}", task.command_line());
        }
        clog_debug!("Task {} spawning: {}", task.name, task.command_line());

        let status = self.spawn(&task.command, &task.env).await?;
        let exit_code = status.code().unwrap_or(-1);

        clog_debug!("Task {} exited with code {}", task.name, exit_code);

        Ok(TaskResult {
            name: task.name.clone(),
            exit_code,
            succeeded: status.success(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn spawn(&self, argv: &[String], env: &[(String, String)]) -> Result<ExitStatus> {
        let (binary, args) = argv
            .split_first()
            .ok_or_else(|| Error::Validation("Cannot run an empty command".to_string()))?;

        let status = Command::new(binary)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(self.stdout_stdio())
            .stderr(self.stderr_stdio())
            .kill_on_drop(true)
            .status()
            .await?;

        Ok(status)
    }

    fn stdout_stdio(&self) -> Stdio {
        if self.verbosity.shows_stdout() {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }

    fn stderr_stdio(&self) -> Stdio {
        if self.verbosity.shows_stderr() {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }
}
