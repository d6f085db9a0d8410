//! End-to-end orchestrator runs against scripted tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cloudstrap_cloud::{CancellationToken, PollSettings, ScriptedCloudApi, ValidationReport};
use cloudstrap_config::{ConfigCollector, DeploymentConfig, OptionTables, Selections};
use cloudstrap_core::{
    DeploymentState, FixedDecision, Orchestrator, TeardownDecision, TeardownRecord,
};
use cloudstrap_iac::{DestroyOutcome, ProvisionPhase, TerraformRunner};
use cloudstrap_runner::{MockResponse, MockToolRunner};
use tempfile::TempDir;

const OUTPUTS: &str = r#"{
  "instance_id": {"sensitive": false, "type": "string", "value": "i-0abc"},
  "instance_public_ip": {"sensitive": false, "type": "string", "value": "54.0.0.10"},
  "load_balancer_dns": {"sensitive": false, "type": "string", "value": "my-test-alb-1.us-east-1.elb.amazonaws.com"}
}"#;

struct Harness {
    dir: TempDir,
    terraform: MockToolRunner,
    cloud: ScriptedCloudApi,
    decider: Arc<FixedDecision>,
    cancel: CancellationToken,
}

impl Harness {
    fn new(terraform: MockToolRunner, cloud: ScriptedCloudApi, decision: TeardownDecision) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("terraform");
        fs::create_dir_all(&workdir).unwrap();
        fs::write(workdir.join("terraform.tfstate"), "{}").unwrap();
        Self {
            dir,
            terraform,
            cloud,
            decider: Arc::new(FixedDecision::new(decision)),
            cancel: CancellationToken::new(),
        }
    }

    fn report_path(&self) -> PathBuf {
        self.dir.path().join("aws_validation.json")
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            TerraformRunner::new(
                Arc::new(self.terraform.clone()),
                &self.dir.path().join("terraform"),
            ),
            Arc::new(self.cloud.clone()),
            self.decider.clone(),
        )
        .with_report_path(self.report_path())
        .with_poll_settings(PollSettings::new(5, Duration::ZERO))
        .with_cancel_token(self.cancel.clone())
    }
}

fn config() -> DeploymentConfig {
    ConfigCollector::new(&OptionTables::standard())
        .collect(
            &Selections::new()
                .ami("ubuntu")
                .instance_type("t3.small")
                .region("us-east-1")
                .availability_zone("us-east-1a")
                .load_balancer_name("my-test-alb"),
        )
        .unwrap()
}

fn applying_terraform() -> MockToolRunner {
    MockToolRunner::new()
        .on("apply", MockResponse::success("Apply complete! Resources: 14 added, 0 changed, 0 destroyed.\n"))
        .on("output", MockResponse::success(OUTPUTS))
        .on("destroy", MockResponse::success("Destroy complete! Resources: 14 destroyed.\n"))
}

fn record_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_successful_deployment_with_validation() {
    let cloud = ScriptedCloudApi::new()
        .instance_states(["pending", "pending", "running"])
        .load_balancer_states(["provisioning", "active"])
        .public_ip("54.0.0.10");
    let harness = Harness::new(applying_terraform(), cloud, TeardownDecision::Keep);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert!(outcome.succeeded());
    assert_eq!(outcome.final_state(), DeploymentState::LeftRunning);
    assert_eq!(
        harness.terraform.subcommands(),
        vec!["init", "plan", "apply", "output"]
    );

    let report = outcome.report.as_ref().unwrap();
    assert!(report.complete);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.instance_state.as_deref(), Some("running"));
    assert_eq!(report.load_balancer_state.as_deref(), Some("active"));
    assert_eq!(ValidationReport::read_from(&harness.report_path()).unwrap(), *report);

    assert!(harness.dir.path().join("terraform").join("main.tf").exists());
    assert_eq!(harness.decider.asked(), 1);
    assert_eq!(outcome.record.teardown, Some(TeardownRecord::Declined));

    let record = record_json(&outcome.record_path);
    assert_eq!(record["teardown"]["outcome"], "declined");
    assert_eq!(record["validation_complete"], true);
    assert_eq!(record["steps"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_apply_failure_skips_validation_but_offers_teardown() {
    let terraform = MockToolRunner::new()
        .on(
            "apply",
            MockResponse::failure(1, "Error: creating ELBv2 application Load Balancer: DuplicateLoadBalancerName")
                .with_stdout("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\naws_lb.application_lb: Creating...\n"),
        )
        .on("destroy", MockResponse::success("Destroy complete! Resources: 1 destroyed.\n"));
    let cloud = ScriptedCloudApi::new();
    let harness = Harness::new(terraform, cloud, TeardownDecision::Destroy);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert!(!outcome.succeeded());
    assert!(outcome.report.is_none());
    assert!(!harness.report_path().exists());
    assert_eq!(harness.cloud.instance_polls(), 0);
    assert!(!harness.terraform.was_called("output"));

    let path = outcome.record.state.path();
    assert!(!path.contains(&DeploymentState::Validating));
    let failed = path.iter().position(|s| *s == DeploymentState::Failed).unwrap();
    assert_eq!(path[failed + 1], DeploymentState::AwaitingTeardownDecision);
    assert_eq!(outcome.final_state(), DeploymentState::Destroyed);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.phase, "apply");
    assert!(failure.diagnostics.as_deref().unwrap().contains("DuplicateLoadBalancerName"));

    let progress = outcome.record.apply_progress.as_ref().unwrap();
    assert_eq!(progress.created, vec!["aws_vpc.main"]);
    assert_eq!(progress.in_flight, vec!["aws_lb.application_lb"]);
    assert_eq!(
        outcome.record.teardown,
        Some(TeardownRecord::Destroyed { resources: Some(1) })
    );
    assert_eq!(harness.terraform.get_subcommand_calls("apply").len(), 1);
}

#[tokio::test]
async fn test_incomplete_validation_is_persisted_and_degraded() {
    let cloud = ScriptedCloudApi::new().load_balancer_states(["provisioning"]);
    let harness = Harness::new(applying_terraform(), cloud, TeardownDecision::Keep);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert!(!outcome.succeeded());
    assert!(outcome.failure().is_none());
    assert!(outcome.record.state.has_visited(DeploymentState::ReportPersisted));

    let persisted = ValidationReport::read_from(&harness.report_path()).unwrap();
    assert!(!persisted.complete);
    assert_eq!(persisted.attempts, 5);
    assert_eq!(persisted.load_balancer_state.as_deref(), Some("provisioning"));
    assert_eq!(persisted.instance_state.as_deref(), Some("running"));
    assert_eq!(harness.decider.asked(), 1);
}

#[tokio::test]
async fn test_init_or_plan_failure_aborts_without_teardown() {
    for failing in ["init", "plan"] {
        let terraform = MockToolRunner::new().on(failing, MockResponse::failure(1, "Error: provider"));
        let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Destroy);

        let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

        assert_eq!(outcome.final_state(), DeploymentState::Failed, "{} failure", failing);
        assert_eq!(outcome.failure().unwrap().phase, failing);
        assert_eq!(outcome.failure().unwrap().diagnostics.as_deref(), Some("Error: provider"));
        assert!(!harness.terraform.was_called("apply"));
        assert!(!harness.terraform.was_called("destroy"));
        assert_eq!(harness.decider.asked(), 0);
        assert!(outcome.record.teardown.is_none());
        assert!(outcome.record_path.exists());
    }
}

#[tokio::test]
async fn test_credentials_failure_runs_no_tool() {
    let cloud = ScriptedCloudApi::new().deny_credentials("Unable to locate credentials");
    let harness = Harness::new(applying_terraform(), cloud, TeardownDecision::Keep);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert_eq!(outcome.failure().unwrap().phase, "credentials");
    assert_eq!(harness.terraform.call_count(), 0);
    assert_eq!(
        outcome.record.state.path(),
        vec![
            DeploymentState::Rendering,
            DeploymentState::Provisioning(ProvisionPhase::Preflight),
            DeploymentState::Failed,
        ]
    );
    // The definition is written before the credentials check.
    assert!(harness.dir.path().join("terraform").join("main.tf").exists());
}

#[tokio::test]
async fn test_missing_output_offers_teardown() {
    let terraform = MockToolRunner::new().on(
        "output",
        MockResponse::success(r#"{"instance_id": {"value": "i-0abc", "sensitive": false}}"#),
    );
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Keep);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.phase, "output");
    assert!(failure.message.contains("load_balancer_dns"));
    assert_eq!(harness.decider.asked(), 1);
    assert_eq!(outcome.final_state(), DeploymentState::LeftRunning);
    assert!(!harness.report_path().exists());
}

#[tokio::test]
async fn test_stale_report_is_removed() {
    let terraform = MockToolRunner::new().on("init", MockResponse::failure(1, "boom"));
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Keep);
    fs::write(harness.report_path(), "{}").unwrap();

    harness.orchestrator().deploy(&config()).await.unwrap();

    assert!(!harness.report_path().exists());
}

#[tokio::test]
async fn test_interrupt_leaves_resources_running() {
    let cloud = ScriptedCloudApi::new().instance_states(["pending"]);
    let harness = Harness::new(applying_terraform(), cloud, TeardownDecision::Destroy);
    harness.cancel.cancel();

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert_eq!(outcome.final_state(), DeploymentState::LeftRunning);
    assert_eq!(outcome.record.teardown, Some(TeardownRecord::SkippedAfterInterrupt));
    assert_eq!(harness.decider.asked(), 0);
    assert!(!harness.terraform.was_called("destroy"));

    let persisted = ValidationReport::read_from(&harness.report_path()).unwrap();
    assert!(persisted.interrupted);
    assert!(!persisted.complete);
}

#[tokio::test]
async fn test_destroy_command_is_idempotent() {
    let terraform = MockToolRunner::new()
        .on("destroy", MockResponse::success("Destroy complete! Resources: 14 destroyed.\n"))
        .on("destroy", MockResponse::success("Destroy complete! Resources: 0 destroyed.\n"));
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Keep);
    let orchestrator = harness.orchestrator();

    let first = orchestrator.destroy().await.unwrap();
    let second = orchestrator.destroy().await.unwrap();

    assert!(matches!(first, DestroyOutcome::Destroyed { count: Some(14), .. }));
    assert!(matches!(second, DestroyOutcome::NothingToDestroy { .. }));
}

#[tokio::test]
async fn test_validate_existing_writes_fresh_report() {
    let terraform = MockToolRunner::new().on("output", MockResponse::success(OUTPUTS));
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Keep);
    fs::write(harness.report_path(), "stale").unwrap();

    let report = harness.orchestrator().validate_existing().await.unwrap();

    assert!(report.complete);
    assert_eq!(report.instance_id.as_deref(), Some("i-0abc"));
    assert_eq!(ValidationReport::read_from(&harness.report_path()).unwrap(), report);
}

#[tokio::test]
async fn test_plan_only_never_applies() {
    let harness = Harness::new(applying_terraform(), ScriptedCloudApi::new(), TeardownDecision::Keep);

    let steps = harness.orchestrator().plan_only(&config()).await.unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(harness.terraform.subcommands(), vec!["init", "plan"]);
}

#[tokio::test]
async fn test_output_read_failure_keeps_apply_step_and_progress() {
    let terraform = MockToolRunner::new()
        .on(
            "apply",
            MockResponse::success("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\n"),
        )
        .on("output", MockResponse::failure(1, "Error: Failed to load state"));
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Keep);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    let phases: Vec<ProvisionPhase> = outcome.record.steps.iter().map(|s| s.phase).collect();
    assert_eq!(
        phases,
        vec![ProvisionPhase::Init, ProvisionPhase::Plan, ProvisionPhase::Apply, ProvisionPhase::Output]
    );
    assert_eq!(
        outcome.record.apply_progress.as_ref().unwrap().created,
        vec!["aws_vpc.main"]
    );

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.phase, "output");
    assert_eq!(failure.diagnostics.as_deref(), Some("Error: Failed to load state"));
    assert_eq!(harness.decider.asked(), 1);
    assert_eq!(outcome.final_state(), DeploymentState::LeftRunning);
}

#[tokio::test]
async fn test_apply_timeout_offers_teardown_with_in_flight_resources() {
    let terraform = MockToolRunner::new()
        .on(
            "apply",
            MockResponse::timed_out("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\naws_lb.application_lb: Creating...\n"),
        )
        .on("destroy", MockResponse::success("Destroy complete! Resources: 1 destroyed.\n"));
    let harness = Harness::new(terraform, ScriptedCloudApi::new(), TeardownDecision::Destroy);

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.phase, "apply");
    assert!(failure.message.contains("timed out"));
    assert!(failure.diagnostics.as_deref().unwrap().contains("aws_lb.application_lb: Creating..."));

    let progress = outcome.record.apply_progress.as_ref().unwrap();
    assert_eq!(progress.in_flight, vec!["aws_lb.application_lb"]);
    assert_eq!(outcome.final_state(), DeploymentState::Destroyed);
    assert!(record_json(&outcome.record_path)["steps"][2]["timed_out"].as_bool().unwrap());
}

#[tokio::test]
async fn test_report_write_failure_still_offers_teardown() {
    let harness = Harness::new(applying_terraform(), ScriptedCloudApi::new(), TeardownDecision::Destroy);
    // A directory where the report's temp file would go makes the write fail.
    fs::create_dir_all(harness.dir.path().join("aws_validation.json.tmp")).unwrap();

    let outcome = harness.orchestrator().deploy(&config()).await.unwrap();

    assert_eq!(outcome.failure().unwrap().phase, "report");
    assert!(outcome.record.report_path.is_none());
    assert!(!harness.report_path().exists());
    assert_eq!(harness.decider.asked(), 1);
    assert_eq!(outcome.final_state(), DeploymentState::Destroyed);
    assert_eq!(
        outcome.record.teardown,
        Some(TeardownRecord::Destroyed { resources: Some(14) })
    );
    assert!(outcome.record_path.exists());
}
