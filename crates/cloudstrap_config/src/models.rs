//! Deployment parameter models.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigResult;
use crate::tables::AmiOption;

/// Raw operator answers, before validation.
///
/// Every field is optional so partial answers can come from a YAML file,
/// command-line flags and interactive prompts, merged in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    pub ami: Option<String>,
    pub instance_type: Option<String>,
    pub region: Option<String>,
    pub availability_zone: Option<String>,
    pub load_balancer_name: Option<String>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load selections from a YAML parameter file.
    pub fn from_yaml_file(path: &Path) -> ConfigResult<Self> {
        debug!("Loading deployment parameters from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn ami(mut self, value: impl Into<String>) -> Self {
        self.ami = Some(value.into());
        self
    }

    pub fn instance_type(mut self, value: impl Into<String>) -> Self {
        self.instance_type = Some(value.into());
        self
    }

    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    pub fn availability_zone(mut self, value: impl Into<String>) -> Self {
        self.availability_zone = Some(value.into());
        self
    }

    pub fn load_balancer_name(mut self, value: impl Into<String>) -> Self {
        self.load_balancer_name = Some(value.into());
        self
    }

    /// Overlay `other` on top of `self`; values present in `other` win.
    pub fn merge(self, other: Selections) -> Self {
        Self {
            ami: other.ami.or(self.ami),
            instance_type: other.instance_type.or(self.instance_type),
            region: other.region.or(self.region),
            availability_zone: other.availability_zone.or(self.availability_zone),
            load_balancer_name: other.load_balancer_name.or(self.load_balancer_name),
        }
    }
}

/// Validated deployment parameters.
///
/// Only [`crate::ConfigCollector`] constructs this type and it exposes no
/// mutators, so a value is fixed for the lifetime of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentConfig {
    ami: AmiOption,
    instance_type: String,
    region: String,
    availability_zone: String,
    secondary_availability_zone: String,
    load_balancer_name: String,
}

impl DeploymentConfig {
    pub(crate) fn new(
        ami: AmiOption,
        instance_type: String,
        region: String,
        availability_zone: String,
        secondary_availability_zone: String,
        load_balancer_name: String,
    ) -> Self {
        Self {
            ami,
            instance_type,
            region,
            availability_zone,
            secondary_availability_zone,
            load_balancer_name,
        }
    }

    pub fn ami(&self) -> &AmiOption {
        &self.ami
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Zone the compute instance is placed in.
    pub fn availability_zone(&self) -> &str {
        &self.availability_zone
    }

    /// Second zone, needed because the load balancer spans two subnets.
    pub fn secondary_availability_zone(&self) -> &str {
        &self.secondary_availability_zone
    }

    pub fn load_balancer_name(&self) -> &str {
        &self.load_balancer_name
    }

    /// Labelled values for the configuration summary.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AMI", format!("{} ({})", self.ami.label, self.ami.image_id)),
            ("Instance Type", self.instance_type.clone()),
            ("Region", self.region.clone()),
            ("Availability Zone", self.availability_zone.clone()),
            ("Load Balancer Name", self.load_balancer_name.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selections_from_yaml() {
        let yaml = r#"
ami: ubuntu
instance_type: t3.small
load_balancer_name: my-test-alb
"#;
        let selections = Selections::from_yaml_str(yaml).unwrap();
        assert_eq!(selections.ami.as_deref(), Some("ubuntu"));
        assert_eq!(selections.region, None);
        assert_eq!(selections.load_balancer_name.as_deref(), Some("my-test-alb"));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let file = Selections::new().ami("ubuntu").instance_type("t3.small");
        let flags = Selections::new().instance_type("t3.medium");

        let merged = file.merge(flags);
        assert_eq!(merged.ami.as_deref(), Some("ubuntu"));
        assert_eq!(merged.instance_type.as_deref(), Some("t3.medium"));
    }
}
