//! CLI command definitions.
//!
//! Each subcommand maps to one lifecycle action of a deployment.

use clap::{Parser, Subcommand};

pub mod args;
pub mod deploy;
pub mod destroy;
pub mod prompt;
pub mod render;
pub mod validate;

/// cloudstrap - guided web tier deployment
#[derive(Parser)]
#[command(name = "cloudstrap")]
#[command(version, about = "cloudstrap - guided web tier deployment")]
#[command(long_about = r#"
cloudstrap collects a handful of deployment choices, renders a Terraform
definition for a load-balanced web instance, provisions it, validates that
the resources came up and offers to tear everything down again.

COMMANDS:
  deploy    → Collect parameters, provision, validate, offer teardown
  render    → Print the rendered definition without provisioning
  validate  → Re-validate resources of an existing deployment
  destroy   → Tear down an existing deployment

EXIT CODES:
  0   - Success
  1   - General error
  2   - Invalid input
  3   - Template error
  4   - Credentials error
  5   - Provisioning error
  6   - Validation incomplete
  130 - Interrupted
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the web tier and validate it
    Deploy(deploy::DeployArgs),

    /// Render the Terraform definition
    Render(render::RenderArgs),

    /// Validate the resources of an existing deployment
    Validate(validate::ValidateArgs),

    /// Destroy an existing deployment
    Destroy(destroy::DestroyArgs),
}
