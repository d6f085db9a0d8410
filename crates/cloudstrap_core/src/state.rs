//! Deployment state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudstrap_iac::ProvisionPhase;

use crate::error::{CoreError, CoreResult};

/// State of one deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum DeploymentState {
    Idle,
    Rendering,
    /// Running a provisioning phase. The credentials check and tool check
    /// happen in `Preflight`; reading outputs happens in `Output`.
    Provisioning(ProvisionPhase),
    Validating,
    ReportPersisted,
    AwaitingTeardownDecision,
    Destroyed,
    LeftRunning,
    Failed,
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self::Idle
    }
}

impl DeploymentState {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(&self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        use ProvisionPhase as P;

        match (*self, next) {
            (Idle, Rendering) => true,
            (Rendering, Provisioning(P::Preflight)) => true,
            (Provisioning(from), Provisioning(to)) => next_phase(from) == Some(to),
            (Provisioning(P::Output), Validating) => true,
            (Validating, ReportPersisted) => true,
            (ReportPersisted, AwaitingTeardownDecision) => true,
            (AwaitingTeardownDecision, Destroyed | LeftRunning) => true,
            (Rendering | Provisioning(_) | Validating, Failed) => true,
            (Failed, AwaitingTeardownDecision) => true,
            _ => false,
        }
    }

    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Destroyed | Self::LeftRunning)
    }
}

fn next_phase(phase: ProvisionPhase) -> Option<ProvisionPhase> {
    match phase {
        ProvisionPhase::Preflight => Some(ProvisionPhase::Init),
        ProvisionPhase::Init => Some(ProvisionPhase::Plan),
        ProvisionPhase::Plan => Some(ProvisionPhase::Apply),
        ProvisionPhase::Apply => Some(ProvisionPhase::Output),
        ProvisionPhase::Output | ProvisionPhase::Destroy => None,
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Rendering => write!(f, "rendering"),
            Self::Provisioning(phase) => write!(f, "provisioning({})", phase),
            Self::Validating => write!(f, "validating"),
            Self::ReportPersisted => write!(f, "report_persisted"),
            Self::AwaitingTeardownDecision => write!(f, "awaiting_teardown_decision"),
            Self::Destroyed => write!(f, "destroyed"),
            Self::LeftRunning => write!(f, "left_running"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One entry of the state history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: DeploymentState,
    pub at: DateTime<Utc>,
}

/// Current state plus the path that led to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMachine {
    current: DeploymentState,
    history: Vec<StateChange>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DeploymentState {
        self.current
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// States visited so far, without timestamps.
    pub fn path(&self) -> Vec<DeploymentState> {
        self.history.iter().map(|c| c.state).collect()
    }

    pub fn has_visited(&self, state: DeploymentState) -> bool {
        self.history.iter().any(|c| c.state == state)
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: DeploymentState) -> CoreResult<()> {
        if !self.current.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        tracing::debug!("State {} -> {}", self.current, next);
        self.current = next;
        self.history.push(StateChange {
            state: next,
            at: Utc::now(),
        });
        Ok(())
    }
}
