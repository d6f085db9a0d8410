//! Arguments shared between commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use cloudstrap_cloud::{AwsCliApi, CancellationToken, PollSettings};
use cloudstrap_config::Selections;
use cloudstrap_core::{Orchestrator, TeardownDecider};
use cloudstrap_iac::TerraformRunner;
use cloudstrap_runner::{CliToolRunner, RunConfig, RunnerOptions, ToolRunner};

/// Deployment parameters. Anything not given is prompted for.
#[derive(Args, Debug, Clone)]
pub struct ParamArgs {
    /// YAML file with parameter values; flags override it
    #[arg(long, env = "CLOUDSTRAP_PARAMS")]
    pub params: Option<PathBuf>,

    /// Machine image (e.g. ubuntu, amazon_linux)
    #[arg(long, env = "CLOUDSTRAP_AMI")]
    pub ami: Option<String>,

    /// Instance type (e.g. t3.small)
    #[arg(long, env = "CLOUDSTRAP_INSTANCE_TYPE")]
    pub instance_type: Option<String>,

    /// Region (only us-east-1 is supported)
    #[arg(long, env = "CLOUDSTRAP_REGION")]
    pub region: Option<String>,

    /// Availability zone for the instance
    #[arg(long, env = "CLOUDSTRAP_AVAILABILITY_ZONE")]
    pub availability_zone: Option<String>,

    /// Name of the application load balancer
    #[arg(long, env = "CLOUDSTRAP_LOAD_BALANCER_NAME")]
    pub load_balancer_name: Option<String>,

    /// Never prompt; missing or invalid values are errors
    #[arg(long)]
    pub non_interactive: bool,
}

impl ParamArgs {
    /// Values given as flags or environment variables.
    pub fn flag_selections(&self) -> Selections {
        Selections {
            ami: self.ami.clone(),
            instance_type: self.instance_type.clone(),
            region: self.region.clone(),
            availability_zone: self.availability_zone.clone(),
            load_balancer_name: self.load_balancer_name.clone(),
        }
    }

    /// Parameter file values overlaid with flag values.
    pub fn selections(&self) -> Result<Selections> {
        let base = match &self.params {
            Some(path) => Selections::from_yaml_file(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?,
            None => Selections::new(),
        };
        Ok(base.merge(self.flag_selections()))
    }
}

/// Where and how the external tools run.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Directory holding the Terraform definition and state
    #[arg(long, default_value = "terraform", env = "CLOUDSTRAP_WORKDIR")]
    pub workdir: PathBuf,

    /// Terraform executable
    #[arg(long, default_value = "terraform", env = "CLOUDSTRAP_TERRAFORM_BIN")]
    pub terraform_bin: String,

    /// AWS CLI executable
    #[arg(long, default_value = "aws", env = "CLOUDSTRAP_AWS_BIN")]
    pub aws_bin: String,

    /// Timeout for a single tool invocation
    #[arg(long, default_value_t = 1800)]
    pub tool_timeout_secs: u64,

    /// Seconds a timed-out tool gets to stop after SIGINT before it is killed
    #[arg(long, default_value_t = 30)]
    pub interrupt_grace_secs: u64,

    /// Echo tool output line by line while it runs
    #[arg(long)]
    pub stream_output: bool,

    /// Log tool invocations without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl ToolArgs {
    pub fn runner(&self) -> Arc<dyn ToolRunner> {
        let mut options = RunnerOptions::new();
        if self.dry_run {
            options = options.dry_run();
        }
        Arc::new(CliToolRunner::new(options))
    }

    pub fn terraform(&self, runner: Arc<dyn ToolRunner>) -> TerraformRunner {
        TerraformRunner::new(runner, &self.workdir)
            .with_binary(&self.terraform_bin)
            .with_run_config(
                RunConfig::default()
                    .timeout(self.tool_timeout_secs)
                    .interrupt_grace(self.interrupt_grace_secs)
                    .stream_logs(self.stream_output),
            )
    }

    pub fn cloud(&self, runner: Arc<dyn ToolRunner>, region: &str) -> AwsCliApi {
        AwsCliApi::new(runner, region).with_binary(&self.aws_bin)
    }

    /// Orchestrator over the real tools for `region`.
    pub fn orchestrator(
        &self,
        region: &str,
        poll: &PollArgs,
        decider: Arc<dyn TeardownDecider>,
        cancel: CancellationToken,
    ) -> Orchestrator {
        let runner = self.runner();
        let cloud = Arc::new(self.cloud(Arc::clone(&runner), region));
        Orchestrator::new(self.terraform(runner), cloud, decider)
            .with_report_path(&poll.report)
            .with_poll_settings(poll.settings())
            .with_cancel_token(cancel)
    }
}

/// Validation polling.
#[derive(Args, Debug, Clone)]
pub struct PollArgs {
    /// Where the validation report is written
    #[arg(long, default_value = cloudstrap_core::DEFAULT_REPORT_FILE)]
    pub report: PathBuf,

    /// Attempts before validation gives up
    #[arg(long, default_value_t = 12)]
    pub max_attempts: u32,

    /// Seconds between attempts
    #[arg(long, default_value_t = 10)]
    pub interval_secs: u64,
}

impl PollArgs {
    pub fn settings(&self) -> PollSettings {
        PollSettings::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            token.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParamArgs {
        ParamArgs {
            params: None,
            ami: None,
            instance_type: Some("t3.medium".to_string()),
            region: None,
            availability_zone: None,
            load_balancer_name: None,
            non_interactive: true,
        }
    }

    #[test]
    fn test_flags_override_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("params.yaml");
        std::fs::write(&file, "ami: ubuntu\ninstance_type: t3.small\n").unwrap();

        let args = ParamArgs {
            params: Some(file),
            ..params()
        };
        let selections = args.selections().unwrap();

        assert_eq!(selections.ami.as_deref(), Some("ubuntu"));
        assert_eq!(selections.instance_type.as_deref(), Some("t3.medium"));
    }

    #[test]
    fn test_missing_parameter_file_is_reported() {
        let args = ParamArgs {
            params: Some(PathBuf::from("/nonexistent/params.yaml")),
            ..params()
        };
        let err = args.selections().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/params.yaml"));
    }

    #[test]
    fn test_poll_settings_from_args() {
        let poll = PollArgs {
            report: PathBuf::from("out.json"),
            max_attempts: 3,
            interval_secs: 2,
        };
        let settings = poll.settings();
        assert_eq!(settings.max_attempts(), 3);
        assert_eq!(settings.interval(), Duration::from_secs(2));
    }
}
