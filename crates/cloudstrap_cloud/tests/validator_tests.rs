//! Polling scenarios against a scripted control plane.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cloudstrap_cloud::{
    CancellationToken, PollSettings, ResourceRef, ResourceValidator, Scripted, ScriptedCloudApi,
    ValidationReport,
};
use tempfile::tempdir;

const LB_DNS: &str = "my-test-alb-123456.us-east-1.elb.amazonaws.com";

fn refs() -> Vec<ResourceRef> {
    vec![ResourceRef::instance("i-0abc"), ResourceRef::load_balancer(LB_DNS)]
}

async fn poll(api: &ScriptedCloudApi, max_attempts: u32) -> ValidationReport {
    ResourceValidator::new(Arc::new(api.clone()))
        .poll(
            &refs(),
            &PollSettings::new(max_attempts, Duration::ZERO),
            &CancellationToken::new(),
        )
        .await
}

#[tokio::test]
async fn test_instance_and_load_balancer_reach_terminal_states() {
    let api = ScriptedCloudApi::new()
        .instance_states(["pending", "pending", "running"])
        .load_balancer_states(["provisioning", "active"])
        .public_ip("54.0.0.10");

    let report = poll(&api, 5).await;

    assert!(report.complete);
    assert!(!report.interrupted);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.instance_id.as_deref(), Some("i-0abc"));
    assert_eq!(report.instance_state.as_deref(), Some("running"));
    assert_eq!(report.public_ip.as_deref(), Some("54.0.0.10"));
    assert_eq!(report.load_balancer_dns.as_deref(), Some(LB_DNS));
    assert_eq!(report.load_balancer_state.as_deref(), Some("active"));
    assert_eq!(api.instance_polls(), 3);
    assert_eq!(api.load_balancer_polls(), 2);
}

#[tokio::test]
async fn test_exhausted_budget_keeps_last_observed_state() {
    let api = ScriptedCloudApi::new()
        .instance_states(["pending", "running"])
        .load_balancer_states(["provisioning"]);

    let report = poll(&api, 5).await;

    assert!(!report.complete);
    assert_eq!(report.attempts, 5);
    assert_eq!(report.instance_state.as_deref(), Some("running"));
    assert_eq!(report.load_balancer_state.as_deref(), Some("provisioning"));
    assert_eq!(api.load_balancer_polls(), 5);
    assert_eq!(api.instance_polls(), 2);
}

#[tokio::test]
async fn test_complete_iff_every_resource_reached_terminal_state() {
    let instance_scripts: Vec<Vec<Scripted>> = vec![
        vec!["running".into()],
        vec!["pending".into(), "pending".into(), "running".into()],
        vec!["pending".into()],
        vec![Scripted::Missing, "running".into()],
        vec![Scripted::Error("throttled".into())],
        vec!["pending".into(), "terminated".into()],
    ];
    let lb_scripts: Vec<Vec<Scripted>> = vec![
        vec!["active".into()],
        vec![Scripted::Missing, Scripted::Missing, "active".into()],
        vec!["provisioning".into()],
        vec!["failed".into()],
    ];

    for max_attempts in 1..=4 {
        for instance in &instance_scripts {
            for lb in &lb_scripts {
                let api = ScriptedCloudApi::new()
                    .instance_states(instance.clone())
                    .load_balancer_states(lb.clone());

                let report = poll(&api, max_attempts).await;

                let reached = report.instance_state.as_deref() == Some("running")
                    && report.load_balancer_state.as_deref() == Some("active");
                assert_eq!(
                    report.complete, reached,
                    "instance {:?}, load balancer {:?}, {} attempts",
                    instance, lb, max_attempts
                );
                assert!(report.attempts <= max_attempts);
            }
        }
    }
}

#[tokio::test]
async fn test_dead_end_resource_is_reported_unreachable() {
    let api = ScriptedCloudApi::new()
        .instance_states(["pending", "running"])
        .load_balancer_states(["failed"]);

    let report = poll(&api, 10).await;

    assert!(!report.complete);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.unreachable, vec![LB_DNS]);
    assert_eq!(api.load_balancer_polls(), 1);
}

#[tokio::test]
async fn test_cancel_stops_polling_during_wait() {
    let api = ScriptedCloudApi::new().instance_states(["pending"]);
    let validator = ResourceValidator::new(Arc::new(api.clone()));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = validator
        .poll(
            &refs(),
            &PollSettings::new(100, Duration::from_secs(3600)),
            &cancel,
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(60));
    assert!(report.interrupted);
    assert!(!report.complete);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.instance_state.as_deref(), Some("pending"));
    assert_eq!(report.load_balancer_state.as_deref(), Some("active"));
    assert_eq!(api.instance_polls(), 1);
}

#[tokio::test]
async fn test_partial_report_is_persisted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("aws_validation.json");
    let api = ScriptedCloudApi::new().load_balancer_states(["provisioning"]);

    poll(&api, 2).await.write_to(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["load_balancer_state"], "provisioning");
    assert_eq!(json["complete"], false);
    assert_eq!(json["instance_state"], "running");
}
