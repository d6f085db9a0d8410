//! Destroy command - Tear down an existing deployment.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use cloudstrap_config::OptionTables;
use cloudstrap_core::{FixedDecision, Orchestrator};
use cloudstrap_iac::DestroyOutcome;

use super::args::ToolArgs;
use crate::ExitCodes;

#[derive(Args, Debug)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub tools: ToolArgs,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn execute(args: DestroyArgs) -> Result<u8> {
    if !args.yes {
        let question = format!(
            "Destroy all resources managed in {}?",
            args.tools.workdir.display()
        );
        let confirmed = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(question)
                .default(false)
                .interact()
        })
        .await?
        .context("destroy confirmation")?;
        if !confirmed {
            println!("Aborted; nothing was destroyed");
            return Ok(ExitCodes::SUCCESS);
        }
    }

    let region = OptionTables::standard().region().to_string();
    let runner = args.tools.runner();
    let orchestrator = Orchestrator::new(
        args.tools.terraform(Arc::clone(&runner)),
        Arc::new(args.tools.cloud(runner, &region)),
        Arc::new(FixedDecision::destroy()),
    );

    match orchestrator.destroy().await? {
        DestroyOutcome::Destroyed { count: Some(n), .. } => {
            println!("✅ Destroyed {} resources", n)
        }
        DestroyOutcome::Destroyed { count: None, .. } => println!("✅ Resources destroyed"),
        DestroyOutcome::NothingToDestroy { .. } => println!("Nothing to destroy"),
    }
    Ok(ExitCodes::SUCCESS)
}
