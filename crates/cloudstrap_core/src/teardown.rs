//! Operator teardown decision.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use cloudstrap_iac::ApplyProgress;

use crate::error::CoreResult;

/// What the operator decided about provisioned resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownDecision {
    Destroy,
    Keep,
}

/// Why teardown is being offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownPrompt {
    /// Provisioning and validation finished.
    Deployed { complete: bool },
    /// `apply` (or reading its outputs) failed; some resources may exist.
    ApplyFailed { progress: ApplyProgress },
}

impl TeardownPrompt {
    pub fn question(&self) -> String {
        match self {
            Self::Deployed { complete: true } => "Do you want to destroy the resources?".to_string(),
            Self::Deployed { complete: false } => {
                "Validation did not complete. Do you want to destroy the resources?".to_string()
            }
            Self::ApplyFailed { progress } if progress.is_empty() => {
                "Apply failed; resources may have been created. Destroy them?".to_string()
            }
            Self::ApplyFailed { progress } => format!(
                "Apply failed with {} resources created and {} in flight. Destroy them?",
                progress.created.len(),
                progress.in_flight.len()
            ),
        }
    }
}

/// Asks whether provisioned resources should be destroyed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TeardownDecider: Send + Sync {
    async fn decide(&self, prompt: &TeardownPrompt) -> CoreResult<TeardownDecision>;
}

/// Decider with a preset answer, for `--destroy`/`--keep` and tests.
#[derive(Debug)]
pub struct FixedDecision {
    decision: TeardownDecision,
    asked: AtomicUsize,
}

impl FixedDecision {
    pub fn new(decision: TeardownDecision) -> Self {
        Self {
            decision,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn destroy() -> Self {
        Self::new(TeardownDecision::Destroy)
    }

    pub fn keep() -> Self {
        Self::new(TeardownDecision::Keep)
    }

    /// How many times a decision was requested.
    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TeardownDecider for FixedDecision {
    async fn decide(&self, _prompt: &TeardownPrompt) -> CoreResult<TeardownDecision> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision)
    }
}
