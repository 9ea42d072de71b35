pub mod cluster;
pub mod config;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod report;

// Task graph and its execution engine
pub mod core;
pub mod orchestration;

pub use config::{RunConfig, Verbosity};
pub use crate::core::{Task, TaskGraph, TaskResult, TaskStatus};
pub use error::{Error, Result};
