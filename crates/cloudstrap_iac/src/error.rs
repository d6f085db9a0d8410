//! Error types for the provisioning lifecycle.

use thiserror::Error;

use crate::phase::{ApplyProgress, ProvisionPhase, ProvisionStepResult};

/// Result type alias for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur while driving the provisioning tool.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Terraform not available: {0}")]
    ToolNotAvailable(String),

    #[error("terraform {} {}: {}", .0.phase, .0.failure(), .0.tail(3))]
    PhaseFailed(Box<ProvisionStepResult>),

    /// `apply` exited non-zero. Resources may exist.
    #[error(
        "terraform apply {}: {} ({} created, {} in flight)",
        .step.failure(), .step.tail(3), .progress.created.len(), .progress.in_flight.len()
    )]
    ApplyFailed {
        step: Box<ProvisionStepResult>,
        progress: ApplyProgress,
    },

    /// `apply` succeeded but its outputs could not be read. Resources exist.
    #[error("terraform apply succeeded but its outputs could not be read: {source}")]
    OutputsFailed {
        apply: Box<ProvisionStepResult>,
        progress: ApplyProgress,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("terraform output is missing required value '{0}'")]
    MissingOutput(String),

    #[error("terraform output could not be parsed: {0}")]
    InvalidOutputs(String),

    #[error("terraform {phase} could not be executed: {source}")]
    Runner {
        phase: ProvisionPhase,
        #[source]
        source: cloudstrap_runner::RunnerError,
    },
}

impl ProvisionError {
    /// The phase the error occurred in.
    pub fn phase(&self) -> ProvisionPhase {
        match self {
            Self::ToolNotAvailable(_) => ProvisionPhase::Preflight,
            Self::PhaseFailed(step) => step.phase,
            Self::ApplyFailed { .. } => ProvisionPhase::Apply,
            Self::OutputsFailed { .. } | Self::MissingOutput(_) | Self::InvalidOutputs(_) => {
                ProvisionPhase::Output
            }
            Self::Runner { phase, .. } => *phase,
        }
    }

    /// The step result of the failing invocation, when the tool ran at all.
    pub fn step(&self) -> Option<&ProvisionStepResult> {
        match self {
            Self::PhaseFailed(step) => Some(step.as_ref()),
            Self::ApplyFailed { step, .. } => Some(step.as_ref()),
            Self::OutputsFailed { source, .. } => source.step(),
            _ => None,
        }
    }

    /// The `apply` step that finished before the failure, if any.
    pub fn completed_apply(&self) -> Option<&ProvisionStepResult> {
        match self {
            Self::OutputsFailed { apply, .. } => Some(apply.as_ref()),
            _ => None,
        }
    }

    /// Resource progress seen in the `apply` output, if apply ran.
    pub fn progress(&self) -> Option<&ApplyProgress> {
        match self {
            Self::ApplyFailed { progress, .. } | Self::OutputsFailed { progress, .. } => {
                Some(progress)
            }
            _ => None,
        }
    }

    /// Whether resources may have been created before the failure, so
    /// teardown should be offered.
    pub fn apply_started(&self) -> bool {
        self.phase().may_have_side_effects() && self.phase() != ProvisionPhase::Destroy
    }

    /// Diagnostic text produced by the failing step.
    pub fn diagnostics(&self) -> Option<&str> {
        self.step().map(|s| s.output.as_str())
    }
}
