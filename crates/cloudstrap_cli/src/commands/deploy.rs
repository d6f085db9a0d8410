//! Deploy command - Provision, validate and offer teardown.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use cloudstrap_cloud::CancellationToken;
use cloudstrap_config::OptionTables;
use cloudstrap_core::{DeploymentOutcome, FixedDecision, TeardownDecider};

use super::args::{cancel_on_interrupt, ParamArgs, PollArgs, ToolArgs};
use super::prompt::{self, DialoguerDecider};
use crate::ExitCodes;

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(flatten)]
    pub poll: PollArgs,

    /// Destroy the resources afterwards without asking
    #[arg(long, conflicts_with = "keep")]
    pub destroy: bool,

    /// Leave the resources running without asking
    #[arg(long)]
    pub keep: bool,
}

impl DeployArgs {
    fn decider(&self) -> Arc<dyn TeardownDecider> {
        if self.destroy {
            Arc::new(FixedDecision::destroy())
        } else if self.keep {
            Arc::new(FixedDecision::keep())
        } else if self.params.non_interactive {
            warn!("Non-interactive run without --destroy or --keep; resources will be kept");
            Arc::new(FixedDecision::keep())
        } else {
            Arc::new(DialoguerDecider)
        }
    }
}

pub async fn execute(args: DeployArgs) -> Result<u8> {
    let tables = OptionTables::standard();
    let selections = args.params.selections()?;
    let config = prompt::resolve(&tables, selections, !args.params.non_interactive)?;

    print_section("Configuration Summary", &config.summary());

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    let orchestrator = args
        .tools
        .orchestrator(config.region(), &args.poll, args.decider(), cancel);

    if args.tools.dry_run {
        info!("Dry run: rendering and planning only");
        let steps = orchestrator.plan_only(&config).await?;
        for step in &steps {
            println!("   ✅ {} ({} ms)", step.command, step.duration_ms);
        }
        return Ok(ExitCodes::SUCCESS);
    }

    println!("🚀 Deploying to {}...", orchestrator.working_dir().display());
    let outcome = orchestrator.deploy(&config).await?;

    print_section("Deployment Summary", &outcome.summary());
    if let Some(failure) = outcome.failure() {
        println!("❌ {} failed: {}", failure.phase, failure.message);
        if let Some(diagnostics) = &failure.diagnostics {
            eprintln!("{}", diagnostics);
        }
    } else if outcome.succeeded() {
        println!("✅ Deployment validated");
    } else {
        println!("⚠️  Deployment applied but not fully validated");
    }

    Ok(exit_code(&outcome))
}

/// Exit code for a finished run.
pub fn exit_code(outcome: &DeploymentOutcome) -> u8 {
    if let Some(failure) = outcome.failure() {
        return ExitCodes::for_phase(&failure.phase);
    }
    match &outcome.report {
        Some(report) if report.interrupted => ExitCodes::INTERRUPTED,
        Some(report) if report.complete => ExitCodes::SUCCESS,
        _ => ExitCodes::VALIDATION_INCOMPLETE,
    }
}

pub(crate) fn print_section(title: &str, lines: &[(&'static str, String)]) {
    println!();
    println!("{}:", title);
    for (label, value) in lines {
        println!("   {:<20} {}", format!("{}:", label), value);
    }
    println!();
}
