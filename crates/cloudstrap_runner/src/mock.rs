//! Mock tool runner for testing.
//!
//! Provides a scripted implementation of the ToolRunner trait for use in
//! unit tests without requiring the real provisioning or cloud tools.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{Invocation, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ToolRunner};

/// Predefined mock response for a tool execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
            timed_out: false,
        }
    }

    /// A run stopped at its timeout after printing `stdout`.
    pub fn timed_out(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 130,
            stdout: stdout.into(),
            stderr: "timed out".to_string(),
            duration_ms: 100,
            timed_out: true,
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl CapturedCall {
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Mock tool runner for testing.
///
/// Responses are looked up by subcommand (the first argument) first, then
/// taken from a general queue, and default to an empty success. A queue
/// keeps returning its last entry once the others have been consumed.
#[derive(Clone, Default)]
pub struct MockToolRunner {
    by_subcommand: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,
    queue: Arc<RwLock<VecDeque<MockResponse>>>,
    unavailable: Arc<RwLock<HashSet<String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for invocations whose first argument is `subcommand`.
    pub fn on(self, subcommand: impl Into<String>, response: MockResponse) -> Self {
        self.by_subcommand
            .write()
            .entry(subcommand.into())
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a response for any invocation without a subcommand-specific one.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.queue.write().push_back(response);
        self
    }

    /// Mark a program as not installed.
    pub fn set_unavailable(self, program: impl Into<String>) -> Self {
        self.unavailable.write().insert(program.into());
        self
    }

    /// Make every run fail at the process level (spawn error).
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Subcommands in invocation order.
    pub fn subcommands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|c| c.subcommand().map(str::to_string))
            .collect()
    }

    /// Check if a subcommand was invoked.
    pub fn was_called(&self, subcommand: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.subcommand() == Some(subcommand))
    }

    /// Get calls for a specific subcommand.
    pub fn get_subcommand_calls(&self, subcommand: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.subcommand() == Some(subcommand))
            .cloned()
            .collect()
    }

    fn pop_or_last(queue: &mut VecDeque<MockResponse>) -> Option<MockResponse> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn next_response(&self, subcommand: Option<&str>) -> MockResponse {
        if let Some(sub) = subcommand {
            if let Some(queue) = self.by_subcommand.write().get_mut(sub) {
                if let Some(response) = Self::pop_or_last(queue) {
                    return response;
                }
            }
        }
        Self::pop_or_last(&mut self.queue.write()).unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        Ok(!self.unavailable.read().contains(program))
    }

    async fn run(
        &self,
        invocation: &Invocation,
        _run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            workdir: invocation.workdir.clone(),
            env: invocation.env.clone(),
        });

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }
        if self.unavailable.read().contains(&invocation.program) {
            return Err(RunnerError::SpawnFailed {
                program: invocation.program.clone(),
                message: "not installed".to_string(),
            });
        }

        let response = self.next_response(invocation.subcommand());
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            command: invocation.command_line(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
            timed_out: response.timed_out,
        })
    }
}
