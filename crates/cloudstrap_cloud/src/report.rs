//! The validation report artifact.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CloudError, CloudResult};

/// Observed resource states after provisioning.
///
/// Field names are the on-disk JSON names. A report is written once; a run
/// that needs a new one removes the old file first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub instance_id: Option<String>,
    pub instance_state: Option<String>,
    pub public_ip: Option<String>,
    pub load_balancer_dns: Option<String>,
    pub load_balancer_state: Option<String>,
    pub validation_timestamp: String,
    /// All tracked resources reached their terminal state.
    pub complete: bool,
    pub attempts: u32,
    #[serde(default)]
    pub interrupted: bool,
    /// Resources that settled in a state from which they cannot become ready.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreachable: Vec<String>,
}

impl ValidationReport {
    /// Write the report as pretty JSON.
    ///
    /// Fails if a report already exists at `path`. The file appears
    /// atomically: it is written to a sibling temp file and renamed.
    pub fn write_to(&self, path: &Path) -> CloudResult<()> {
        if path.exists() {
            return Err(CloudError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("validation report {} already exists", path.display()),
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        info!("Validation results saved to {}", path.display());
        Ok(())
    }

    pub fn read_from(path: &Path) -> CloudResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Remove a report left by an earlier run. Returns whether one existed.
    pub fn remove_stale(path: &Path) -> CloudResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed stale validation report {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Infrastructure exists but did not fully validate.
    pub fn is_degraded(&self) -> bool {
        !self.complete
    }
}
