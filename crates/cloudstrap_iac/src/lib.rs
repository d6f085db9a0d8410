//! # cloudstrap_iac
//!
//! Drives the Terraform lifecycle for cloudstrap.
//!
//! The provisioning phases form a typed chain: [`TerraformRunner::init`]
//! yields an [`Initialized`] value, whose `plan` yields a [`Planned`] value,
//! whose `apply` yields [`Applied`]. Each step consumes the previous one, so
//! `apply` cannot be reached unless `init` and `plan` both succeeded.
//! [`TerraformRunner::destroy`] is a separate lifecycle action.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use cloudstrap_iac::TerraformRunner;
//! use cloudstrap_runner::{CliToolRunner, RunnerOptions};
//!
//! # async fn run() -> cloudstrap_iac::ProvisionResult<()> {
//! let runner = TerraformRunner::new(
//!     Arc::new(CliToolRunner::new(RunnerOptions::default())),
//!     Path::new("./terraform"),
//! );
//!
//! let applied = runner.init().await?.plan().await?.apply().await?;
//! println!("instance: {:?}", applied.outputs.get_str("instance_id"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod outputs;
pub mod phase;
pub mod terraform;

pub use error::{ProvisionError, ProvisionResult};
pub use outputs::{OutputValue, TerraformOutputs};
pub use phase::{ApplyProgress, ProvisionPhase, ProvisionStepResult};
pub use terraform::{Applied, DestroyOutcome, Initialized, Planned, TerraformRunner, PLAN_FILE};
