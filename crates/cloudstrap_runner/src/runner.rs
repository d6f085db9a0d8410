//! Tool runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Invocation, RunConfig};
use crate::error::RunnerResult;

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Rendered command line
    pub command: String,
    /// Exit code from the process (-1 when killed by a signal)
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// The run exceeded its timeout and was stopped
    #[serde(default)]
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0, within its timeout).
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Tool runner trait.
///
/// Implementations block (from the caller's point of view) until the
/// external process has terminated.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Check whether a program can be executed at all.
    async fn is_available(&self, program: &str) -> RunnerResult<bool>;

    /// Run an invocation to completion.
    async fn run(&self, invocation: &Invocation, run_config: &RunConfig)
        -> RunnerResult<ExecutionResult>;
}
