//! Error types for deployment parameters.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while collecting deployment parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    Missing(&'static str),

    #[error("Invalid {field} '{value}' (allowed: {})", .allowed.join(", "))]
    UnknownOption {
        field: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Region '{value}' is not allowed (only {allowed} is supported)")]
    RegionNotAllowed { value: String, allowed: String },

    #[error("Invalid load balancer name '{name}': {reason}")]
    InvalidLoadBalancerName { name: String, reason: String },

    #[error("Invalid option tables: {0}")]
    InvalidTables(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Whether the error was caused by an operator answer, i.e. re-prompting
    /// can fix it.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Missing(_)
                | Self::UnknownOption { .. }
                | Self::RegionNotAllowed { .. }
                | Self::InvalidLoadBalancerName { .. }
        )
    }
}
