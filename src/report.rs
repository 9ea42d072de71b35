//! Run reporting: end-of-run summary and the last-run record on disk.
//!
//! Every run writes `~/.chaosup/last-run.json` with the full set of task
//! results so a failed deployment can be inspected after the terminal
//! scrollback is gone. Saving is best-effort; the deployment outcome never
//! depends on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clog_debug;
use crate::config::{Config, RunConfig};
use crate::core::task::TaskResult;
use crate::error::Result;

/// Unique identifier for a deployment run.
///
/// UUID v4 with a short form for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Record of one deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// The kubectl context the run targeted.
    pub context: String,
    /// Configuration the run executed under.
    pub config: RunConfig,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per task that ran, in completion order.
    pub results: Vec<TaskResult>,
}

impl RunReport {
    /// Whether every task that ran exited zero.
    pub fn succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded).count()
    }

    pub fn total_duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Print the per-task summary table.
    pub fn print_summary(&self) {
        println!();
        println!("Deployment summary (run {}):", self.run_id.short());
        for result in &self.results {
            let marker = if result.succeeded { "ok" } else { "FAIL" };
            let detail = if result.succeeded {
                format_duration(result.duration())
            } else {
                format!("exit {}, {}", result.exit_code, format_duration(result.duration()))
            };
            println!("  {:<5} {:<18} {}", marker, result.name, detail);
        }
        let succeeded = self.results.len() - self.failed_count();
        println!(
            "{} succeeded, {} failed in {}",
            succeeded,
            self.failed_count(),
            format_duration(self.total_duration())
        );
    }

    /// Persist the report to `~/.chaosup/last-run.json`.
    ///
    /// Callers treat a failure here as a warning, not a run failure.
    pub fn save(&self) -> Result<()> {
        let dir = Config::chaosup_dir()?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        let path = Config::report_path()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        clog_debug!("Run report saved to {}", path.display());
        Ok(())
    }
}

fn format_duration(d: chrono::Duration) -> String {
    format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0)
}
