//! Error types for the core module.

use thiserror::Error;

use crate::state::DeploymentState;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that stop the orchestrator itself.
///
/// A failing provisioning step is not one of these: it ends the run in the
/// `Failed` state and is reported through [`crate::RunRecord::failure`].
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: DeploymentState,
        to: DeploymentState,
    },

    #[error("Teardown decision failed: {0}")]
    Decision(String),

    #[error("Template error: {0}")]
    Template(#[from] cloudstrap_templates::TemplateError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] cloudstrap_iac::ProvisionError),

    #[error("Cloud error: {0}")]
    Cloud(#[from] cloudstrap_cloud::CloudError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
