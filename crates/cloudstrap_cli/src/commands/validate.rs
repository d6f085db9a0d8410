//! Validate command - Re-check resources of an existing deployment.

use anyhow::Result;
use clap::Args;

use cloudstrap_cloud::CancellationToken;
use cloudstrap_config::OptionTables;
use cloudstrap_core::FixedDecision;

use super::args::{cancel_on_interrupt, PollArgs, ToolArgs};
use super::deploy::print_section;
use crate::ExitCodes;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

pub async fn execute(args: ValidateArgs) -> Result<u8> {
    let region = OptionTables::standard().region().to_string();
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    // Validation never asks about teardown.
    let orchestrator = args.tools.orchestrator(
        &region,
        &args.poll,
        std::sync::Arc::new(FixedDecision::keep()),
        cancel,
    );

    println!("🔍 Validating resources in {}...", orchestrator.working_dir().display());
    let report = orchestrator.validate_existing().await?;

    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let mut lines = vec![
        ("Instance ID", show(&report.instance_id)),
        ("Instance State", show(&report.instance_state)),
        ("Public IP", show(&report.public_ip)),
        ("Load Balancer DNS", show(&report.load_balancer_dns)),
        ("Load Balancer State", show(&report.load_balancer_state)),
        ("Attempts", report.attempts.to_string()),
        ("Report", orchestrator.report_path().display().to_string()),
    ];
    if !report.unreachable.is_empty() {
        lines.push(("Unreachable", report.unreachable.join(", ")));
    }
    print_section("Validation Summary", &lines);

    if report.interrupted {
        return Ok(ExitCodes::INTERRUPTED);
    }
    if report.complete {
        println!("✅ All resources are up");
        Ok(ExitCodes::SUCCESS)
    } else {
        println!("⚠️  Validation incomplete");
        Ok(ExitCodes::VALIDATION_INCOMPLETE)
    }
}
