//! Persistent record of a deployment run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use cloudstrap_config::DeploymentConfig;
use cloudstrap_iac::{ApplyProgress, ProvisionStepResult};

use crate::error::{CoreError, CoreResult};
use crate::state::StateMachine;

/// Where and why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    /// `render`, `credentials`, `preflight`, `init`, `plan`, `apply`,
    /// `output`, `report` or `destroy`.
    pub phase: String,
    pub message: String,
    /// Captured output of the failing step, if a tool ran.
    pub diagnostics: Option<String>,
}

impl RunFailure {
    pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: message.into(),
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Option<&str>) -> Self {
        self.diagnostics = diagnostics.map(str::to_string);
        self
    }
}

/// What happened to provisioned resources at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TeardownRecord {
    Destroyed { resources: Option<u32> },
    NothingToDestroy,
    /// The operator chose to keep the resources.
    Declined,
    /// No answer could be obtained; the resources were kept.
    Undecided { reason: String },
    /// Validation was interrupted; no question was asked.
    SkippedAfterInterrupt,
    DestroyFailed { message: String },
}

impl TeardownRecord {
    pub fn resources_left_running(&self) -> bool {
        matches!(
            self,
            Self::Declined
                | Self::Undecided { .. }
                | Self::SkippedAfterInterrupt
                | Self::DestroyFailed { .. }
        )
    }
}

/// Everything the orchestrator did in one run, saved under
/// `<workdir>/.cloudstrap/runs/<run_id>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub working_dir: PathBuf,
    pub config: DeploymentConfig,
    pub state: StateMachine,
    pub steps: Vec<ProvisionStepResult>,
    pub failure: Option<RunFailure>,
    pub apply_progress: Option<ApplyProgress>,
    pub report_path: Option<PathBuf>,
    pub validation_complete: Option<bool>,
    pub teardown: Option<TeardownRecord>,
}

impl RunRecord {
    pub fn new(config: &DeploymentConfig, working_dir: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            completed_at: None,
            working_dir: working_dir.to_path_buf(),
            config: config.clone(),
            state: StateMachine::new(),
            steps: Vec::new(),
            failure: None,
            apply_progress: None,
            report_path: None,
            validation_complete: None,
            teardown: None,
        }
    }

    pub fn runs_dir(working_dir: &Path) -> PathBuf {
        working_dir.join(".cloudstrap").join("runs")
    }

    pub fn path(&self) -> PathBuf {
        Self::runs_dir(&self.working_dir).join(format!("{}.json", self.run_id))
    }

    /// Save the record to disk, returning its path.
    pub fn save(&self) -> CoreResult<PathBuf> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        debug!("Saved run record to {:?}", path);
        Ok(path)
    }
}
