//! Integration tests for the Terraform lifecycle driver.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use cloudstrap_iac::{DestroyOutcome, ProvisionError, ProvisionPhase, TerraformRunner, PLAN_FILE};
use cloudstrap_runner::{MockResponse, MockToolRunner};
use tempfile::tempdir;

const OUTPUTS: &str = r#"{
  "instance_id": {"sensitive": false, "type": "string", "value": "i-0abc"},
  "load_balancer_dns": {"sensitive": false, "type": "string", "value": "my-test-alb-1.us-east-1.elb.amazonaws.com"}
}"#;

fn terraform(mock: &MockToolRunner, dir: &Path) -> TerraformRunner {
    TerraformRunner::new(Arc::new(mock.clone()), dir)
}

async fn run_chain(runner: &TerraformRunner) -> Result<(), ProvisionError> {
    runner.init().await?.plan().await?.apply().await?;
    Ok(())
}

#[tokio::test]
async fn test_full_chain_runs_phases_in_order() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new()
        .on("apply", MockResponse::success("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\n"))
        .on("output", MockResponse::success(OUTPUTS));
    let runner = terraform(&mock, dir.path());

    let applied = runner.init().await.unwrap().plan().await.unwrap().apply().await.unwrap();

    assert_eq!(mock.subcommands(), vec!["init", "plan", "apply", "output"]);
    assert_eq!(applied.outputs.get_str("instance_id"), Some("i-0abc"));
    assert_eq!(applied.progress.created, vec!["aws_vpc.main"]);

    let plan = &mock.get_subcommand_calls("plan")[0];
    assert!(plan.args.contains(&format!("-out={}", PLAN_FILE)));
    let apply = &mock.get_subcommand_calls("apply")[0];
    assert_eq!(apply.args.last().map(String::as_str), Some(PLAN_FILE));
    assert_eq!(apply.workdir.as_deref(), Some(dir.path()));
    assert_eq!(apply.env.get("TF_IN_AUTOMATION").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_apply_never_runs_after_earlier_failure() {
    for failing in ["init", "plan"] {
        let dir = tempdir().unwrap();
        let mock = MockToolRunner::new().on(failing, MockResponse::failure(1, "Error: boom"));
        let runner = terraform(&mock, dir.path());

        let err = run_chain(&runner).await.unwrap_err();

        assert!(!mock.was_called("apply"), "apply ran after {} failed", failing);
        assert_eq!(err.phase().as_str(), failing);
        assert!(!err.apply_started());
        assert_eq!(err.step().unwrap().output, "Error: boom");
    }
}

#[tokio::test]
async fn test_plan_not_run_after_init_failure() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new().on("init", MockResponse::failure(1, "no provider"));

    let _ = run_chain(&terraform(&mock, dir.path())).await;

    assert_eq!(mock.subcommands(), vec!["init"]);
}

#[tokio::test]
async fn test_apply_failure_reports_progress_and_is_not_retried() {
    let dir = tempdir().unwrap();
    let apply_output = "aws_vpc.main: Creating...\n\
        aws_vpc.main: Creation complete after 2s [id=vpc-1]\n\
        aws_instance.web_server: Creating...\n\
        Error: creating EC2 Instance: InsufficientInstanceCapacity\n\
          with aws_instance.web_server,\n";
    let mock = MockToolRunner::new().on("apply", MockResponse::failure(1, "").with_stdout(apply_output));
    let runner = terraform(&mock, dir.path());

    let err = run_chain(&runner).await.unwrap_err();

    match &err {
        ProvisionError::ApplyFailed { step, progress } => {
            assert_eq!(step.phase, ProvisionPhase::Apply);
            assert_eq!(step.exit_code, 1);
            assert!(step.output.contains("InsufficientInstanceCapacity"));
            assert_eq!(progress.created, vec!["aws_vpc.main"]);
            assert_eq!(progress.in_flight, vec!["aws_instance.web_server"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.apply_started());
    assert_eq!(mock.get_subcommand_calls("apply").len(), 1);
    assert!(!mock.was_called("output"));
}

#[tokio::test]
async fn test_output_failure_counts_as_started_apply() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new().on("output", MockResponse::success("not json"));

    let err = run_chain(&terraform(&mock, dir.path())).await.unwrap_err();

    match &err {
        ProvisionError::OutputsFailed { source, .. } => {
            assert!(matches!(source.as_ref(), ProvisionError::InvalidOutputs(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.phase(), ProvisionPhase::Output);
    assert!(err.apply_started());
}

#[tokio::test]
async fn test_output_failure_keeps_completed_apply() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new()
        .on(
            "apply",
            MockResponse::success("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\n"),
        )
        .on("output", MockResponse::failure(1, "Error: state lock"));

    let err = run_chain(&terraform(&mock, dir.path())).await.unwrap_err();

    let apply = err.completed_apply().unwrap();
    assert_eq!(apply.phase, ProvisionPhase::Apply);
    assert!(apply.success);
    assert_eq!(err.progress().unwrap().created, vec!["aws_vpc.main"]);
    assert_eq!(err.step().unwrap().phase, ProvisionPhase::Output);
    assert_eq!(err.diagnostics(), Some("Error: state lock"));
}

#[tokio::test]
async fn test_apply_timeout_reports_in_flight_resources() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new().on(
        "apply",
        MockResponse::timed_out("aws_vpc.main: Creating...\naws_vpc.main: Creation complete after 2s [id=vpc-1]\naws_lb.application_lb: Creating...\n"),
    );

    let err = run_chain(&terraform(&mock, dir.path())).await.unwrap_err();

    match &err {
        ProvisionError::ApplyFailed { step, progress } => {
            assert!(step.timed_out);
            assert_eq!(progress.created, vec!["aws_vpc.main"]);
            assert_eq!(progress.in_flight, vec!["aws_lb.application_lb"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("timed out"));
    assert!(err.diagnostics().unwrap().contains("aws_lb.application_lb: Creating..."));
    assert!(!mock.was_called("output"));
}

#[tokio::test]
async fn test_preflight_detects_missing_binary() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new().set_unavailable("tofu");
    let runner = terraform(&mock, dir.path()).with_binary("tofu");

    let err = runner.preflight().await.unwrap_err();

    assert!(matches!(err, ProvisionError::ToolNotAvailable(_)));
    assert_eq!(err.phase(), ProvisionPhase::Preflight);
    assert!(terraform(&MockToolRunner::new(), dir.path()).preflight().await.is_ok());
}

#[tokio::test]
async fn test_destroy_without_state_is_a_no_op() {
    let dir = tempdir().unwrap();
    let mock = MockToolRunner::new();

    let outcome = terraform(&mock, dir.path()).destroy().await.unwrap();

    assert!(matches!(outcome, DestroyOutcome::NothingToDestroy { step: None }));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_destroy_twice_is_not_fatal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("terraform.tfstate"), "{}").unwrap();
    let mock = MockToolRunner::new()
        .on("destroy", MockResponse::success("Destroy complete! Resources: 14 destroyed.\n"))
        .on("destroy", MockResponse::success("No changes. No objects need to be destroyed.\n\nDestroy complete! Resources: 0 destroyed.\n"));
    let runner = terraform(&mock, dir.path());

    let first = runner.destroy().await.unwrap();
    let second = runner.destroy().await.unwrap();

    assert!(matches!(first, DestroyOutcome::Destroyed { count: Some(14), .. }));
    assert!(matches!(second, DestroyOutcome::NothingToDestroy { step: Some(_) }));

    let call = &mock.get_subcommand_calls("destroy")[0];
    assert!(call.args.contains(&"-auto-approve".to_string()));
}

#[tokio::test]
async fn test_destroy_failure_keeps_diagnostics() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("terraform.tfstate"), "{}").unwrap();
    let mock = MockToolRunner::new()
        .on("destroy", MockResponse::failure(1, "Error: DependencyViolation"));

    let err = terraform(&mock, dir.path()).destroy().await.unwrap_err();

    assert_eq!(err.phase(), ProvisionPhase::Destroy);
    assert!(!err.apply_started());
    assert_eq!(err.diagnostics(), Some("Error: DependencyViolation"));
    assert!(err.to_string().contains("terraform destroy failed"));
}
