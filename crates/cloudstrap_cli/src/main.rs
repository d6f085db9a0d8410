//! cloudstrap CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success (deployed and fully validated)
//! - 1: General error
//! - 2: Invalid input
//! - 3: Template error
//! - 4: Credentials error
//! - 5: Provisioning error
//! - 6: Validation incomplete
//! - 130: Interrupted

use std::process::ExitCode;

use clap::Parser;
use cloudstrap_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const TEMPLATE_ERROR: u8 = 3;
    pub const CREDENTIALS_ERROR: u8 = 4;
    pub const PROVISION_ERROR: u8 = 5;
    pub const VALIDATION_INCOMPLETE: u8 = 6;
    pub const INTERRUPTED: u8 = 130;

    /// Exit code for a run that failed in `phase`.
    pub fn for_phase(phase: &str) -> u8 {
        match phase {
            "render" => Self::TEMPLATE_ERROR,
            "credentials" => Self::CREDENTIALS_ERROR,
            "report" => Self::GENERAL_ERROR,
            _ => Self::PROVISION_ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cloudstrap={},warn", level)));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args).await,
        Commands::Render(args) => commands::render::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Destroy(args) => commands::destroy::execute(args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<cloudstrap_config::ConfigError>() {
        if err.is_input_error() {
            return ExitCodes::INVALID_INPUT;
        }
    }
    if e.downcast_ref::<cloudstrap_templates::TemplateError>().is_some() {
        return ExitCodes::TEMPLATE_ERROR;
    }
    if let Some(err) = e.downcast_ref::<cloudstrap_cloud::CloudError>() {
        if err.is_credentials() {
            return ExitCodes::CREDENTIALS_ERROR;
        }
    }
    if e.downcast_ref::<cloudstrap_iac::ProvisionError>().is_some() {
        return ExitCodes::PROVISION_ERROR;
    }
    match e.downcast_ref::<CoreError>() {
        Some(CoreError::Template(_)) => ExitCodes::TEMPLATE_ERROR,
        Some(CoreError::Provision(_)) => ExitCodes::PROVISION_ERROR,
        Some(CoreError::Cloud(err)) if err.is_credentials() => ExitCodes::CREDENTIALS_ERROR,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
