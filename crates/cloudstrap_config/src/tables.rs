//! Enumerated option tables.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// A selectable machine image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmiOption {
    /// Short key the operator selects (e.g. `ubuntu`)
    pub key: String,
    /// Human readable label
    pub label: String,
    /// Provider image id substituted into the definition
    pub image_id: String,
}

impl AmiOption {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        image_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            image_id: image_id.into(),
        }
    }
}

/// Immutable lookup tables the collector validates selections against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTables {
    amis: Vec<AmiOption>,
    instance_types: Vec<String>,
    region: String,
    availability_zones: Vec<String>,
}

impl OptionTables {
    /// Build tables. The load balancer needs subnets in two zones, so at
    /// least two availability zones are required.
    pub fn new(
        amis: Vec<AmiOption>,
        instance_types: Vec<String>,
        region: impl Into<String>,
        availability_zones: Vec<String>,
    ) -> ConfigResult<Self> {
        if amis.is_empty() {
            return Err(ConfigError::InvalidTables("no machine images".to_string()));
        }
        if instance_types.is_empty() {
            return Err(ConfigError::InvalidTables("no instance types".to_string()));
        }
        if availability_zones.len() < 2 {
            return Err(ConfigError::InvalidTables(
                "at least two availability zones are required".to_string(),
            ));
        }
        Ok(Self {
            amis,
            instance_types,
            region: region.into(),
            availability_zones,
        })
    }

    /// The tables cloudstrap ships with (us-east-1 only).
    pub fn standard() -> Self {
        Self {
            amis: vec![
                AmiOption::new("ubuntu", "Ubuntu 20.04 LTS", "ami-0c02fb55956c7d316"),
                AmiOption::new("amazon_linux", "Amazon Linux 2", "ami-0b898040803850657"),
            ],
            instance_types: vec!["t3.small".to_string(), "t3.medium".to_string()],
            region: "us-east-1".to_string(),
            availability_zones: vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
        }
    }

    pub fn amis(&self) -> &[AmiOption] {
        &self.amis
    }

    pub fn instance_types(&self) -> &[String] {
        &self.instance_types
    }

    /// The single permitted region.
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn availability_zones(&self) -> &[String] {
        &self.availability_zones
    }

    /// Look up an image by key (case-insensitive) or 1-based menu position.
    pub fn find_ami(&self, choice: &str) -> Option<&AmiOption> {
        let choice = choice.trim();
        self.amis
            .iter()
            .find(|a| a.key.eq_ignore_ascii_case(choice))
            .or_else(|| by_position(&self.amis, choice))
    }

    /// Look up an instance type by name or 1-based menu position.
    pub fn find_instance_type(&self, choice: &str) -> Option<&str> {
        let choice = choice.trim();
        self.instance_types
            .iter()
            .find(|t| t.eq_ignore_ascii_case(choice))
            .or_else(|| by_position(&self.instance_types, choice))
            .map(String::as_str)
    }

    /// Look up a zone by name or 1-based menu position.
    pub fn find_zone(&self, choice: &str) -> Option<&str> {
        let choice = choice.trim();
        self.availability_zones
            .iter()
            .find(|z| z.eq_ignore_ascii_case(choice))
            .or_else(|| by_position(&self.availability_zones, choice))
            .map(String::as_str)
    }

    /// First allowed zone other than `zone`.
    pub fn secondary_zone(&self, zone: &str) -> Option<&str> {
        self.availability_zones
            .iter()
            .find(|z| z.as_str() != zone)
            .map(String::as_str)
    }
}

fn by_position<'a, T>(items: &'a [T], choice: &str) -> Option<&'a T> {
    choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| items.get(i))
}
