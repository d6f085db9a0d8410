//! # cloudstrap_cloud
//!
//! Cloud control-plane access and post-provisioning validation.
//!
//! [`ResourceValidator::poll`] queries each provisioned resource through a
//! [`CloudApi`] until it reports its terminal state or the retry budget in
//! [`PollSettings`] is spent, and assembles a [`ValidationReport`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudstrap_cloud::{
//!     AwsCliApi, CancellationToken, PollSettings, ResourceRef, ResourceValidator,
//! };
//! use cloudstrap_runner::{CliToolRunner, RunnerOptions};
//!
//! # async fn run() {
//! let runner = Arc::new(CliToolRunner::new(RunnerOptions::default()));
//! let validator = ResourceValidator::new(Arc::new(AwsCliApi::new(runner, "us-east-1")));
//!
//! let refs = [
//!     ResourceRef::instance("i-0123456789abcdef0"),
//!     ResourceRef::load_balancer("my-test-alb-1234.us-east-1.elb.amazonaws.com"),
//! ];
//! let report = validator
//!     .poll(&refs, &PollSettings::default(), &CancellationToken::new())
//!     .await;
//! println!("complete: {}", report.complete);
//! # }
//! ```

pub mod api;
pub mod aws;
pub mod error;
pub mod report;
pub mod scripted;
pub mod validator;

pub use api::{CallerIdentity, CloudApi, InstanceDescription, LoadBalancerDescription};
pub use aws::AwsCliApi;
pub use error::{CloudError, CloudResult};
pub use report::ValidationReport;
pub use scripted::{Scripted, ScriptedCloudApi};
pub use validator::{PollSettings, ResourceRef, ResourceValidator, TIMESTAMP_FORMAT};

pub use tokio_util::sync::CancellationToken;
