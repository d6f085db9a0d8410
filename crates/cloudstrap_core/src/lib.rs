//! # cloudstrap_core
//!
//! Deployment orchestration for cloudstrap.
//!
//! The [`Orchestrator`] composes rendering, the Terraform phase chain,
//! resource validation and the teardown decision into one run, moving a
//! [`StateMachine`] through its checked [`DeploymentState`] transitions:
//!
//! ```text
//! idle -> rendering -> provisioning(preflight -> init -> plan -> apply -> output)
//!      -> validating -> report_persisted -> awaiting_teardown_decision
//!      -> destroyed | left_running
//! ```
//!
//! A step failure while rendering or provisioning moves the run to `failed`.
//! From there the only way on is `awaiting_teardown_decision`, and only when
//! `apply` had started. Every run is recorded in a [`RunRecord`].

pub mod error;
pub mod orchestrator;
pub mod record;
pub mod state;
pub mod teardown;

pub use error::{CoreError, CoreResult};
pub use orchestrator::{
    DeploymentOutcome, Orchestrator, DEFAULT_REPORT_FILE, INSTANCE_ID_OUTPUT,
    LOAD_BALANCER_DNS_OUTPUT,
};
pub use record::{RunFailure, RunRecord, TeardownRecord};
pub use state::{DeploymentState, StateChange, StateMachine};
pub use teardown::{FixedDecision, TeardownDecider, TeardownDecision, TeardownPrompt};
