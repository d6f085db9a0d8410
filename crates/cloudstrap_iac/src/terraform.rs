//! Terraform runner with a typed phase chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use cloudstrap_runner::{Invocation, RunConfig, ToolRunner};

use crate::error::{ProvisionError, ProvisionResult};
use crate::outputs::TerraformOutputs;
use crate::phase::{ApplyProgress, ProvisionPhase, ProvisionStepResult};

/// Plan file written by `plan` and consumed by `apply`.
pub const PLAN_FILE: &str = "cloudstrap.tfplan";

const STATE_FILE: &str = "terraform.tfstate";

/// Terraform runner bound to one working directory.
pub struct TerraformRunner {
    runner: Arc<dyn ToolRunner>,
    binary: String,
    working_dir: PathBuf,
    run_config: RunConfig,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(runner: Arc<dyn ToolRunner>, working_dir: &Path) -> Self {
        Self {
            runner,
            binary: "terraform".to_string(),
            working_dir: working_dir.to_path_buf(),
            run_config: RunConfig::default().timeout(1800), // 30 minute timeout
        }
    }

    /// Use a different terraform executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Check that the terraform executable can be run.
    pub async fn preflight(&self) -> ProvisionResult<()> {
        let available = self
            .runner
            .is_available(&self.binary)
            .await
            .map_err(|source| ProvisionError::Runner {
                phase: ProvisionPhase::Preflight,
                source,
            })?;
        if !available {
            return Err(ProvisionError::ToolNotAvailable(format!(
                "'{}' is not installed or not in PATH",
                self.binary
            )));
        }
        Ok(())
    }

    /// Run terraform init. The first link of the phase chain.
    pub async fn init(&self) -> ProvisionResult<Initialized<'_>> {
        info!("Running terraform init in {:?}", self.working_dir);
        let step = self
            .run_phase(ProvisionPhase::Init, &["init", "-input=false", "-no-color"])
            .await?;
        Ok(Initialized { runner: self, step })
    }

    /// Read `terraform output -json` for the current state.
    pub async fn outputs(&self) -> ProvisionResult<TerraformOutputs> {
        let step = self
            .run_phase(ProvisionPhase::Output, &["output", "-json"])
            .await?;
        TerraformOutputs::parse(&step.output)
    }

    /// Run terraform destroy.
    ///
    /// Having nothing to destroy (no state file, or zero resources destroyed)
    /// is reported as [`DestroyOutcome::NothingToDestroy`], not as an error.
    pub async fn destroy(&self) -> ProvisionResult<DestroyOutcome> {
        if !self.working_dir.join(STATE_FILE).exists() {
            info!("No state in {:?}, nothing to destroy", self.working_dir);
            return Ok(DestroyOutcome::NothingToDestroy { step: None });
        }

        info!("Running terraform destroy in {:?}", self.working_dir);
        let step = self
            .run_phase(
                ProvisionPhase::Destroy,
                &["destroy", "-input=false", "-no-color", "-auto-approve"],
            )
            .await?;

        match (destroyed_count(&step.output), nothing_to_destroy(&step.output)) {
            (Some(0), _) | (None, true) => {
                info!("Destroy found no resources");
                Ok(DestroyOutcome::NothingToDestroy { step: Some(step) })
            }
            (count, _) => {
                match count {
                    Some(count) => info!("Destroyed {} resources", count),
                    None => info!("Destroy complete"),
                }
                Ok(DestroyOutcome::Destroyed { count, step })
            }
        }
    }

    /// Execute one phase; a non-zero exit becomes [`ProvisionError::PhaseFailed`].
    async fn run_phase(
        &self,
        phase: ProvisionPhase,
        args: &[&str],
    ) -> ProvisionResult<ProvisionStepResult> {
        let step = self.execute(phase, args).await?;
        if !step.success {
            error!("terraform {} {}", phase, step.failure());
            return Err(ProvisionError::PhaseFailed(Box::new(step)));
        }
        Ok(step)
    }

    async fn execute(
        &self,
        phase: ProvisionPhase,
        args: &[&str],
    ) -> ProvisionResult<ProvisionStepResult> {
        let invocation = Invocation::new(&self.binary)
            .args(args.iter().copied())
            .workdir(&self.working_dir)
            .env("TF_IN_AUTOMATION", "1");

        debug!("Executing terraform {:?}", args);

        let result = self
            .runner
            .run(&invocation, &self.run_config)
            .await
            .map_err(|source| ProvisionError::Runner { phase, source })?;

        Ok(ProvisionStepResult::from_execution(phase, &result))
    }
}

/// `init` succeeded; `plan` is the only way forward.
#[must_use = "an initialized working directory is only useful for planning"]
pub struct Initialized<'r> {
    runner: &'r TerraformRunner,
    step: ProvisionStepResult,
}

impl<'r> Initialized<'r> {
    pub fn step(&self) -> &ProvisionStepResult {
        &self.step
    }

    /// Run terraform plan, saving the plan for `apply`.
    pub async fn plan(self) -> ProvisionResult<Planned<'r>> {
        info!("Running terraform plan in {:?}", self.runner.working_dir);
        let out = format!("-out={}", PLAN_FILE);
        let step = self
            .runner
            .run_phase(
                ProvisionPhase::Plan,
                &["plan", "-input=false", "-no-color", &out],
            )
            .await?;
        Ok(Planned {
            runner: self.runner,
            step,
        })
    }
}

/// `plan` succeeded; `apply` executes exactly the saved plan.
#[must_use = "a plan does nothing until it is applied"]
pub struct Planned<'r> {
    runner: &'r TerraformRunner,
    step: ProvisionStepResult,
}

impl<'r> Planned<'r> {
    pub fn step(&self) -> &ProvisionStepResult {
        &self.step
    }

    /// Run terraform apply on the saved plan and read the outputs.
    ///
    /// Never retried: a failed apply is reported with the resources that
    /// were created or still in flight so the caller can decide on cleanup.
    pub async fn apply(self) -> ProvisionResult<Applied> {
        info!("Running terraform apply in {:?}", self.runner.working_dir);
        let step = self
            .runner
            .execute(
                ProvisionPhase::Apply,
                &["apply", "-input=false", "-no-color", PLAN_FILE],
            )
            .await?;
        let progress = ApplyProgress::scan(&step.output);

        if !step.success {
            error!(
                "terraform apply {} ({} created, {} in flight)",
                step.failure(),
                progress.created.len(),
                progress.in_flight.len()
            );
            return Err(ProvisionError::ApplyFailed {
                step: Box::new(step),
                progress,
            });
        }

        let outputs = match self.runner.outputs().await {
            Ok(outputs) => outputs,
            Err(source) => {
                error!("terraform apply succeeded but reading outputs failed: {}", source);
                return Err(ProvisionError::OutputsFailed {
                    apply: Box::new(step),
                    progress,
                    source: Box::new(source),
                });
            }
        };
        if outputs.is_empty() {
            warn!("terraform apply produced no outputs");
        }

        info!("Terraform applied successfully");
        Ok(Applied {
            step,
            progress,
            outputs,
        })
    }
}

/// `apply` succeeded.
#[derive(Debug, Clone)]
pub struct Applied {
    pub step: ProvisionStepResult,
    pub progress: ApplyProgress,
    pub outputs: TerraformOutputs,
}

/// Result of a destroy request.
#[derive(Debug, Clone)]
pub enum DestroyOutcome {
    Destroyed {
        count: Option<u32>,
        step: ProvisionStepResult,
    },
    NothingToDestroy {
        step: Option<ProvisionStepResult>,
    },
}

impl DestroyOutcome {
    pub fn step(&self) -> Option<&ProvisionStepResult> {
        match self {
            Self::Destroyed { step, .. } => Some(step),
            Self::NothingToDestroy { step } => step.as_ref(),
        }
    }
}

/// Parse `Destroy complete! Resources: N destroyed.`
fn destroyed_count(output: &str) -> Option<u32> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Destroy complete! Resources: ")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn nothing_to_destroy(output: &str) -> bool {
    output.contains("No objects need to be destroyed")
}
