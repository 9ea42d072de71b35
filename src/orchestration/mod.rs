//! Orchestration layer: running the deployment graph.
//!
//! The command runner executes one task's child process with
//! verbosity-routed stdio; the scheduler walks the task graph, dispatching
//! every task whose dependencies are Done (or one at a time in sequential
//! mode) until the pipeline is complete.

mod runner;
mod scheduler;

pub use runner::CommandRunner;
pub use scheduler::{Scheduler, SchedulerEvent};
