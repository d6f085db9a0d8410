//! End-to-end deployment driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use cloudstrap_cloud::{
    CancellationToken, CloudApi, PollSettings, ResourceRef, ResourceValidator, ValidationReport,
};
use cloudstrap_config::DeploymentConfig;
use cloudstrap_iac::{
    Applied, ApplyProgress, DestroyOutcome, ProvisionError, ProvisionPhase, ProvisionResult,
    ProvisionStepResult, TerraformOutputs, TerraformRunner,
};
use cloudstrap_templates::{DefinitionWriter, TemplateRenderer};

use crate::error::CoreResult;
use crate::record::{RunFailure, RunRecord, TeardownRecord};
use crate::state::DeploymentState;
use crate::teardown::{TeardownDecider, TeardownDecision, TeardownPrompt};

/// Default location of the validation report.
pub const DEFAULT_REPORT_FILE: &str = "aws_validation.json";

pub const INSTANCE_ID_OUTPUT: &str = "instance_id";
pub const LOAD_BALANCER_DNS_OUTPUT: &str = "load_balancer_dns";

/// Result of [`Orchestrator::deploy`].
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub record: RunRecord,
    pub record_path: PathBuf,
    /// Present only when validation ran.
    pub report: Option<ValidationReport>,
}

impl DeploymentOutcome {
    pub fn final_state(&self) -> DeploymentState {
        self.record.state.current()
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.record.failure.as_ref()
    }

    /// Rendering, provisioning and validation all finished, with every
    /// resource in its terminal state.
    pub fn succeeded(&self) -> bool {
        self.failure().is_none() && self.report.as_ref().is_some_and(|r| r.complete)
    }

    /// Labelled values for the deployment summary.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();
        if let Some(report) = &self.report {
            let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
            lines.push(("Instance ID", show(&report.instance_id)));
            lines.push(("Instance State", show(&report.instance_state)));
            lines.push(("Public IP", show(&report.public_ip)));
            lines.push(("Load Balancer DNS", show(&report.load_balancer_dns)));
            lines.push(("Load Balancer State", show(&report.load_balancer_state)));
            let validation = if report.interrupted {
                "interrupted"
            } else if report.complete {
                "complete"
            } else {
                "incomplete"
            };
            lines.push(("Validation", format!("{} after {} attempts", validation, report.attempts)));
        }
        if let Some(path) = &self.record.report_path {
            lines.push(("Report", path.display().to_string()));
        }
        if let Some(failure) = self.failure() {
            lines.push(("Failed Phase", failure.phase.clone()));
        }
        if let Some(teardown) = &self.record.teardown {
            let text = match teardown {
                TeardownRecord::Destroyed { resources: Some(n) } => format!("destroyed {} resources", n),
                TeardownRecord::Destroyed { resources: None } => "destroyed".to_string(),
                TeardownRecord::NothingToDestroy => "nothing to destroy".to_string(),
                TeardownRecord::Declined => "resources left running".to_string(),
                TeardownRecord::Undecided { reason } => {
                    format!("no decision ({}), resources left running", reason)
                }
                TeardownRecord::SkippedAfterInterrupt => {
                    "interrupted, resources left running".to_string()
                }
                TeardownRecord::DestroyFailed { message } => format!("destroy failed: {}", message),
            };
            lines.push(("Teardown", text));
        }
        lines.push(("Run Record", self.record_path.display().to_string()));
        lines
    }
}

/// A step failure that ends the provisioning part of a run.
struct Stopped {
    failure: RunFailure,
    /// Steps that ran as part of the failure, in order.
    steps: Vec<ProvisionStepResult>,
    apply_started: bool,
    progress: ApplyProgress,
}

impl Stopped {
    fn before_apply(failure: RunFailure) -> Self {
        Self {
            failure,
            steps: Vec::new(),
            apply_started: false,
            progress: ApplyProgress::default(),
        }
    }
}

impl From<ProvisionError> for Stopped {
    fn from(err: ProvisionError) -> Self {
        let steps = err
            .completed_apply()
            .into_iter()
            .chain(err.step())
            .cloned()
            .collect();
        Self {
            failure: RunFailure::new(err.phase().as_str(), err.to_string())
                .with_diagnostics(err.diagnostics()),
            steps,
            apply_started: err.apply_started(),
            progress: err.progress().cloned().unwrap_or_default(),
        }
    }
}

/// Drives render, provisioning, validation and the teardown decision.
pub struct Orchestrator {
    renderer: TemplateRenderer,
    terraform: TerraformRunner,
    cloud: Arc<dyn CloudApi>,
    decider: Arc<dyn TeardownDecider>,
    report_path: PathBuf,
    poll: PollSettings,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        terraform: TerraformRunner,
        cloud: Arc<dyn CloudApi>,
        decider: Arc<dyn TeardownDecider>,
    ) -> Self {
        Self {
            renderer: TemplateRenderer::new(),
            terraform,
            cloud,
            decider,
            report_path: PathBuf::from(DEFAULT_REPORT_FILE),
            poll: PollSettings::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Cancelling this token interrupts validation polling.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn working_dir(&self) -> &Path {
        self.terraform.working_dir()
    }

    /// Run the full lifecycle for `config`.
    ///
    /// Step failures do not return `Err`; they end the run in the `Failed`
    /// state and are described in the outcome. Once resources may exist the
    /// run always ends with a teardown decision and a saved record. `Err`
    /// means the orchestrator itself could not continue (clearing a stale
    /// report, saving the record).
    pub async fn deploy(&self, config: &DeploymentConfig) -> CoreResult<DeploymentOutcome> {
        let mut run = RunRecord::new(config, self.terraform.working_dir());
        info!("Starting deployment run {}", run.run_id);

        if ValidationReport::remove_stale(&self.report_path)? {
            info!("Removed validation report of an earlier run");
        }

        let applied = match self.provision(config, &mut run).await? {
            Ok(applied) => applied,
            Err(stopped) => return self.finish_failed(run, stopped).await,
        };

        run.state.advance(DeploymentState::Provisioning(ProvisionPhase::Output))?;
        let resources = match resource_refs(&applied.outputs) {
            Ok(resources) => resources,
            Err(e) => return self.finish_failed(run, Stopped::from(e)).await,
        };

        run.state.advance(DeploymentState::Validating)?;
        info!("Validating deployed resources");
        let report = ResourceValidator::new(Arc::clone(&self.cloud))
            .poll(&resources, &self.poll, &self.cancel)
            .await;

        if let Err(e) = report.write_to(&self.report_path) {
            // Resources exist, so the run still ends with a teardown decision.
            error!("Could not persist validation report: {}", e);
            run.validation_complete = Some(report.complete);
            run.state.advance(DeploymentState::Failed)?;
            run.failure = Some(RunFailure::new("report", e.to_string()));
            run.state.advance(DeploymentState::AwaitingTeardownDecision)?;
            let prompt = TeardownPrompt::Deployed {
                complete: report.complete,
            };
            let teardown = self.teardown(&mut run, &prompt).await?;
            return self.finish(run, Some(teardown), Some(report));
        }
        run.report_path = Some(self.report_path.clone());
        run.validation_complete = Some(report.complete);
        run.state.advance(DeploymentState::ReportPersisted)?;

        if report.complete {
            info!("All resources reached their expected state");
        } else {
            warn!(
                "Deployment applied but degraded: validation incomplete after {} attempts",
                report.attempts
            );
        }

        run.state.advance(DeploymentState::AwaitingTeardownDecision)?;
        let teardown = if report.interrupted {
            warn!("Validation interrupted; leaving resources running");
            run.state.advance(DeploymentState::LeftRunning)?;
            TeardownRecord::SkippedAfterInterrupt
        } else {
            let prompt = TeardownPrompt::Deployed {
                complete: report.complete,
            };
            self.teardown(&mut run, &prompt).await?
        };

        self.finish(run, Some(teardown), Some(report))
    }

    /// Render, write, check credentials and run `init`, `plan` and `apply`.
    async fn provision(
        &self,
        config: &DeploymentConfig,
        run: &mut RunRecord,
    ) -> CoreResult<Result<Applied, Stopped>> {
        run.state.advance(DeploymentState::Rendering)?;
        let writer = DefinitionWriter::new(self.terraform.working_dir());
        let written = self
            .renderer
            .render(config)
            .and_then(|definition| writer.write(&definition));
        if let Err(e) = written {
            return Ok(Err(Stopped::before_apply(RunFailure::new("render", e.to_string()))));
        }

        run.state.advance(DeploymentState::Provisioning(ProvisionPhase::Preflight))?;
        match self.cloud.caller_identity().await {
            Ok(identity) => info!("Using account {} ({})", identity.account, identity.arn),
            Err(e) => {
                return Ok(Err(Stopped::before_apply(RunFailure::new(
                    "credentials",
                    e.to_string(),
                ))))
            }
        }
        if let Err(e) = self.terraform.preflight().await {
            return Ok(Err(e.into()));
        }

        run.state.advance(DeploymentState::Provisioning(ProvisionPhase::Init))?;
        let initialized = match self.terraform.init().await {
            Ok(initialized) => initialized,
            Err(e) => return Ok(Err(e.into())),
        };
        run.steps.push(initialized.step().clone());

        run.state.advance(DeploymentState::Provisioning(ProvisionPhase::Plan))?;
        let planned = match initialized.plan().await {
            Ok(planned) => planned,
            Err(e) => return Ok(Err(e.into())),
        };
        run.steps.push(planned.step().clone());

        run.state.advance(DeploymentState::Provisioning(ProvisionPhase::Apply))?;
        match planned.apply().await {
            Ok(applied) => {
                run.steps.push(applied.step.clone());
                run.apply_progress = Some(applied.progress.clone());
                Ok(Ok(applied))
            }
            Err(e) => Ok(Err(e.into())),
        }
    }

    async fn finish_failed(
        &self,
        mut run: RunRecord,
        stopped: Stopped,
    ) -> CoreResult<DeploymentOutcome> {
        error!(
            "Deployment failed in phase {}: {}",
            stopped.failure.phase, stopped.failure.message
        );
        run.steps.extend(stopped.steps);
        run.state.advance(DeploymentState::Failed)?;
        run.failure = Some(stopped.failure);

        if !stopped.apply_started {
            info!("No resources were created; nothing to clean up");
            return self.finish(run, None, None);
        }

        let progress = if stopped.progress.is_empty() {
            run.apply_progress.clone().unwrap_or_default()
        } else {
            stopped.progress
        };
        run.apply_progress = Some(progress.clone());

        run.state.advance(DeploymentState::AwaitingTeardownDecision)?;
        let teardown = self
            .teardown(&mut run, &TeardownPrompt::ApplyFailed { progress })
            .await?;
        self.finish(run, Some(teardown), None)
    }

    async fn teardown(
        &self,
        run: &mut RunRecord,
        prompt: &TeardownPrompt,
    ) -> CoreResult<TeardownRecord> {
        let decision = match self.decider.decide(prompt).await {
            Ok(decision) => decision,
            Err(e) => {
                // Resources are never destroyed without an explicit answer.
                warn!("No teardown decision ({}); leaving resources running", e);
                run.state.advance(DeploymentState::LeftRunning)?;
                return Ok(TeardownRecord::Undecided {
                    reason: e.to_string(),
                });
            }
        };
        match decision {
            TeardownDecision::Keep => {
                info!("Resources left running at operator request");
                run.state.advance(DeploymentState::LeftRunning)?;
                Ok(TeardownRecord::Declined)
            }
            TeardownDecision::Destroy => match self.terraform.destroy().await {
                Ok(outcome) => {
                    if let Some(step) = outcome.step() {
                        run.steps.push(step.clone());
                    }
                    run.state.advance(DeploymentState::Destroyed)?;
                    Ok(match outcome {
                        DestroyOutcome::Destroyed { count, .. } => {
                            TeardownRecord::Destroyed { resources: count }
                        }
                        DestroyOutcome::NothingToDestroy { .. } => TeardownRecord::NothingToDestroy,
                    })
                }
                Err(e) => {
                    error!("Teardown failed: {}", e);
                    if let Some(step) = e.step() {
                        run.steps.push(step.clone());
                    }
                    run.state.advance(DeploymentState::LeftRunning)?;
                    if run.failure.is_none() {
                        run.failure = Some(
                            RunFailure::new("destroy", e.to_string())
                                .with_diagnostics(e.diagnostics()),
                        );
                    }
                    Ok(TeardownRecord::DestroyFailed {
                        message: e.to_string(),
                    })
                }
            },
        }
    }

    fn finish(
        &self,
        mut run: RunRecord,
        teardown: Option<TeardownRecord>,
        report: Option<ValidationReport>,
    ) -> CoreResult<DeploymentOutcome> {
        run.teardown = teardown;
        run.completed_at = Some(chrono::Utc::now());
        let record_path = run.save()?;
        info!("Run {} finished in state {}", run.run_id, run.state.current());
        Ok(DeploymentOutcome {
            record: run,
            record_path,
            report,
        })
    }

    /// Render and write the definition, then run `init` and `plan` only.
    pub async fn plan_only(&self, config: &DeploymentConfig) -> CoreResult<Vec<ProvisionStepResult>> {
        let definition = self.renderer.render(config)?;
        DefinitionWriter::new(self.terraform.working_dir()).write(&definition)?;

        let initialized = self.terraform.init().await?;
        let init_step = initialized.step().clone();
        let planned = initialized.plan().await?;
        Ok(vec![init_step, planned.step().clone()])
    }

    /// Validate the resources of the existing state and write a fresh report.
    pub async fn validate_existing(&self) -> CoreResult<ValidationReport> {
        let outputs = self.terraform.outputs().await?;
        let resources = resource_refs(&outputs)?;

        ValidationReport::remove_stale(&self.report_path)?;
        let report = ResourceValidator::new(Arc::clone(&self.cloud))
            .poll(&resources, &self.poll, &self.cancel)
            .await;
        report.write_to(&self.report_path)?;
        Ok(report)
    }

    /// Operator-triggered teardown of the existing state.
    pub async fn destroy(&self) -> CoreResult<DestroyOutcome> {
        Ok(self.terraform.destroy().await?)
    }
}

/// Resources to validate, taken from the required outputs.
fn resource_refs(outputs: &TerraformOutputs) -> ProvisionResult<Vec<ResourceRef>> {
    let instance_id = outputs.require(INSTANCE_ID_OUTPUT)?;
    let load_balancer_dns = outputs.require(LOAD_BALANCER_DNS_OUTPUT)?;
    Ok(vec![
        ResourceRef::instance(instance_id),
        ResourceRef::load_balancer(load_balancer_dns),
    ])
}
