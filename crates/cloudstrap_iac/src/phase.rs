//! Provisioning phases and their per-invocation results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cloudstrap_runner::ExecutionResult;

/// A provisioning tool phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionPhase {
    Preflight,
    Init,
    Plan,
    Apply,
    Output,
    Destroy,
}

impl ProvisionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Output => "output",
            Self::Destroy => "destroy",
        }
    }

    /// Whether a failure in this phase may have left resources behind.
    pub fn may_have_side_effects(&self) -> bool {
        matches!(self, Self::Apply | Self::Output | Self::Destroy)
    }
}

impl std::fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one provisioning tool invocation. Not persisted on its own;
/// the orchestrator copies it into the run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionStepResult {
    pub phase: ProvisionPhase,
    pub command: String,
    pub exit_code: i64,
    pub success: bool,
    pub output: String,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

impl ProvisionStepResult {
    pub fn from_execution(phase: ProvisionPhase, result: &ExecutionResult) -> Self {
        Self {
            phase,
            command: result.command.clone(),
            exit_code: result.exit_code,
            success: result.success(),
            output: result.combined_output(),
            duration_ms: result.duration_ms,
            timed_out: result.timed_out,
        }
    }

    /// How the step failed, for error messages.
    pub fn failure(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            format!("failed with exit code {}", self.exit_code)
        }
    }

    /// Last few non-empty output lines, for one-line error messages.
    pub fn tail(&self, lines: usize) -> String {
        let tail: Vec<&str> = self
            .output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let start = tail.len().saturating_sub(lines);
        tail[start..].join(" | ")
    }
}

/// Resource progress scraped from `apply` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyProgress {
    /// Resources whose creation finished.
    pub created: Vec<String>,
    /// Resources whose creation started (or errored) but never finished.
    pub in_flight: Vec<String>,
}

impl ApplyProgress {
    /// Scan apply output for `<address>: Creating...`,
    /// `<address>: Creation complete ...` and `with <address>,` lines.
    pub fn scan(output: &str) -> Self {
        let mut started: Vec<String> = Vec::new();
        let mut completed: BTreeSet<String> = BTreeSet::new();

        for raw in output.lines() {
            let line = raw.trim_start_matches(['│', '╷', '╵', ' ', '\t']).trim_end();

            if let Some(addr) = line.strip_suffix(": Creating...") {
                push_unique(&mut started, addr);
            } else if let Some((addr, _)) = line.split_once(": Creation complete") {
                push_unique(&mut started, addr);
                completed.insert(addr.to_string());
            } else if let Some(rest) = line.strip_prefix("with ") {
                if let Some(addr) = rest.strip_suffix(',') {
                    push_unique(&mut started, addr);
                }
            }
        }

        let (created, in_flight): (Vec<String>, Vec<String>) =
            started.into_iter().partition(|a| completed.contains(a));
        Self { created, in_flight }
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.in_flight.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, addr: &str) {
    let addr = addr.trim();
    if !addr.is_empty() && !list.iter().any(|a| a == addr) {
        list.push(addr.to_string());
    }
}
