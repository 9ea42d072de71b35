//! Core domain models for the deployment orchestrator.
//!
//! This module contains the fundamental data structures: tasks (named
//! external commands with declared dependencies) and the task graph they
//! are scheduled through.

pub mod graph;
pub mod task;

pub use graph::TaskGraph;
pub use task::{Task, TaskResult, TaskStatus};
