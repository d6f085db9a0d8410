//! Parsed `terraform output -json` values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, ProvisionResult};

/// One entry of `terraform output -json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    pub value: serde_json::Value,
    #[serde(default)]
    pub sensitive: bool,
}

/// All outputs of the current state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerraformOutputs(BTreeMap<String, OutputValue>);

impl TerraformOutputs {
    pub fn parse(json: &str) -> ProvisionResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| ProvisionError::InvalidOutputs(e.to_string()))
    }

    /// String value of an output; `None` for absent, null or empty values.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|o| o.value.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn require(&self, name: &str) -> ProvisionResult<&str> {
        self.get_str(name)
            .ok_or_else(|| ProvisionError::MissingOutput(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
