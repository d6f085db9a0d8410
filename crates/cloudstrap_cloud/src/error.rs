//! Error types for cloud API access.

use thiserror::Error;

/// Result type alias for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors returned by a [`crate::CloudApi`] implementation.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Cloud credentials are missing or invalid: {0}")]
    Credentials(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Cloud API call failed: {0}")]
    Api(String),

    #[error("Unexpected cloud API response: {0}")]
    Parse(String),

    #[error("Cloud CLI could not be executed: {0}")]
    Runner(#[from] cloudstrap_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_credentials(&self) -> bool {
        matches!(self, Self::Credentials(_))
    }
}
