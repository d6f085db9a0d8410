//! # cloudstrap_runner
//!
//! External tool execution wrapper for cloudstrap.
//!
//! Every command/response boundary in cloudstrap (the provisioning tool and
//! the cloud provider CLI) goes through the [`ToolRunner`] trait, so the
//! orchestration logic never spawns processes directly.
//!
//! # Features
//!
//! - **Process Runner**: blocking-until-exit execution with captured output
//! - **Streaming**: optional line-by-line echo while capturing
//! - **Dry-Run Mode**: log commands without execution
//! - **CI Integration**: timestamped log lines when `CI` is set
//! - **Mock Runner**: scripted responses and call capture for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudstrap_runner::{CliToolRunner, RunnerOptions, ToolRunner, Invocation, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = CliToolRunner::new(RunnerOptions::default());
//!
//!     let invocation = Invocation::new("terraform")
//!         .args(["version"])
//!         .workdir("./terraform");
//!
//!     let result = runner.run(&invocation, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mock;
pub mod runner;

pub use cli::{CliToolRunner, LogHandler, LogLine, LogStream, RunnerOptions};
pub use config::{Invocation, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockToolRunner};
pub use runner::{ExecutionResult, ToolRunner};
