//! Validation of operator selections.

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::models::{DeploymentConfig, Selections};
use crate::tables::{AmiOption, OptionTables};

/// Maximum load balancer name length accepted by the provider.
pub const MAX_LOAD_BALANCER_NAME_LEN: usize = 32;

/// Validates raw selections against a set of option tables.
///
/// This is a single validating function; whether to re-prompt or abort on an
/// [`ConfigError`] is up to the caller.
pub struct ConfigCollector<'a> {
    tables: &'a OptionTables,
}

impl<'a> ConfigCollector<'a> {
    pub fn new(tables: &'a OptionTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &OptionTables {
        self.tables
    }

    /// Validate every selection and build the deployment configuration.
    pub fn collect(&self, selections: &Selections) -> ConfigResult<DeploymentConfig> {
        let ami = self.check_ami(required(&selections.ami, "ami")?)?;
        let instance_type =
            self.check_instance_type(required(&selections.instance_type, "instance type")?)?;
        let region = self.check_region(selections.region.as_deref())?;
        let zone = self.check_zone(required(&selections.availability_zone, "availability zone")?)?;
        let name = check_load_balancer_name(required(
            &selections.load_balancer_name,
            "load balancer name",
        )?)?;

        let secondary = self
            .tables
            .secondary_zone(&zone)
            .ok_or_else(|| ConfigError::InvalidTables("no secondary availability zone".to_string()))?
            .to_string();

        debug!(
            "Collected deployment config: ami={}, type={}, zone={}, lb={}",
            ami.key, instance_type, zone, name
        );

        Ok(DeploymentConfig::new(
            ami,
            instance_type,
            region,
            zone,
            secondary,
            name,
        ))
    }

    pub fn check_ami(&self, choice: &str) -> ConfigResult<AmiOption> {
        self.tables
            .find_ami(choice)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownOption {
                field: "ami",
                value: choice.to_string(),
                allowed: self.tables.amis().iter().map(|a| a.key.clone()).collect(),
            })
    }

    pub fn check_instance_type(&self, choice: &str) -> ConfigResult<String> {
        self.tables
            .find_instance_type(choice)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::UnknownOption {
                field: "instance type",
                value: choice.to_string(),
                allowed: self.tables.instance_types().to_vec(),
            })
    }

    /// An absent or blank answer means the permitted region; anything else
    /// must match it exactly.
    pub fn check_region(&self, choice: Option<&str>) -> ConfigResult<String> {
        let allowed = self.tables.region();
        match choice.map(str::trim) {
            None | Some("") => Ok(allowed.to_string()),
            Some(value) if value == allowed => Ok(allowed.to_string()),
            Some(value) => Err(ConfigError::RegionNotAllowed {
                value: value.to_string(),
                allowed: allowed.to_string(),
            }),
        }
    }

    pub fn check_zone(&self, choice: &str) -> ConfigResult<String> {
        self.tables
            .find_zone(choice)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::UnknownOption {
                field: "availability zone",
                value: choice.to_string(),
                allowed: self.tables.availability_zones().to_vec(),
            })
    }
}

/// Provider naming rules: 1-32 characters, ASCII alphanumerics and hyphens,
/// no leading or trailing hyphen.
pub fn check_load_balancer_name(name: &str) -> ConfigResult<String> {
    let name = name.trim();
    let invalid = |reason: &str| ConfigError::InvalidLoadBalancerName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_LOAD_BALANCER_NAME_LEN {
        return Err(invalid("name must be at most 32 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("only letters, digits and hyphens are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("name must not start or end with a hyphen"));
    }
    Ok(name.to_string())
}

fn required<'s>(value: &'s Option<String>, field: &'static str) -> ConfigResult<&'s str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}
