//! [`CloudApi`] backed by the `aws` command line tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use cloudstrap_runner::{Invocation, RunConfig, ToolRunner};

use crate::api::{CallerIdentity, CloudApi, InstanceDescription, LoadBalancerDescription};
use crate::error::{CloudError, CloudResult};

const CREDENTIAL_MARKERS: &[&str] = &[
    "Unable to locate credentials",
    "InvalidClientTokenId",
    "ExpiredToken",
    "SignatureDoesNotMatch",
    "AuthFailure",
    "The config profile",
];

const NOT_FOUND_MARKERS: &[&str] = &["InvalidInstanceID.NotFound", "InvalidInstanceID.Malformed"];

/// Cloud API that shells out to the `aws` CLI with JSON output.
pub struct AwsCliApi {
    runner: Arc<dyn ToolRunner>,
    binary: String,
    region: String,
    run_config: RunConfig,
}

impl AwsCliApi {
    pub fn new(runner: Arc<dyn ToolRunner>, region: impl Into<String>) -> Self {
        Self {
            runner,
            binary: "aws".to_string(),
            region: region.into(),
            run_config: RunConfig::default().timeout(60),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn query<T: DeserializeOwned>(&self, args: &[&str]) -> CloudResult<T> {
        let invocation = Invocation::new(&self.binary)
            .args(args.iter().copied())
            .args(["--region", self.region.as_str(), "--output", "json"]);
        debug!("Querying {}", invocation.command_line());

        let result = self.runner.run(&invocation, &self.run_config).await?;
        if !result.success() {
            let err = classify_failure(&result.combined_output());
            warn!("{} failed: {}", invocation.command_line(), err);
            return Err(err);
        }

        serde_json::from_str(&result.stdout).map_err(|e| {
            let operation: Vec<&str> = args.iter().take(2).copied().collect();
            CloudError::Parse(format!("{}: {}", operation.join(" "), e))
        })
    }
}

#[async_trait]
impl CloudApi for AwsCliApi {
    async fn caller_identity(&self) -> CloudResult<CallerIdentity> {
        let identity: StsIdentity = self
            .query(&["sts", "get-caller-identity"])
            .await
            .map_err(|e| match e {
                CloudError::Credentials(_) => e,
                other => CloudError::Credentials(other.to_string()),
            })?;
        Ok(CallerIdentity {
            account: identity.account,
            arn: identity.arn,
            user_id: identity.user_id,
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> CloudResult<InstanceDescription> {
        let response: DescribeInstances = self
            .query(&["ec2", "describe-instances", "--instance-ids", instance_id])
            .await
            .map_err(|e| match e {
                CloudError::NotFound { .. } => CloudError::NotFound {
                    kind: "instance",
                    id: instance_id.to_string(),
                },
                other => other,
            })?;

        let instance = response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .find(|i| i.instance_id == instance_id)
            .ok_or_else(|| CloudError::NotFound {
                kind: "instance",
                id: instance_id.to_string(),
            })?;

        Ok(InstanceDescription {
            instance_id: instance.instance_id,
            state: instance.state.name,
            public_ip: instance.public_ip_address,
        })
    }

    async fn describe_load_balancer(
        &self,
        dns_name: &str,
    ) -> CloudResult<Option<LoadBalancerDescription>> {
        let response: DescribeLoadBalancers =
            self.query(&["elbv2", "describe-load-balancers"]).await?;

        Ok(response
            .load_balancers
            .into_iter()
            .find(|lb| lb.dns_name.eq_ignore_ascii_case(dns_name))
            .map(|lb| LoadBalancerDescription {
                dns_name: lb.dns_name,
                state: lb.state.code,
            }))
    }
}

/// Map the CLI's error text to an error kind.
fn classify_failure(output: &str) -> CloudError {
    let message = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("no output")
        .to_string();

    if CREDENTIAL_MARKERS.iter().any(|m| output.contains(m)) {
        CloudError::Credentials(message)
    } else if NOT_FOUND_MARKERS.iter().any(|m| output.contains(m)) {
        CloudError::NotFound {
            kind: "resource",
            id: message,
        }
    } else {
        CloudError::Api(message)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsIdentity {
    user_id: String,
    account: String,
    arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    instance_id: String,
    state: InstanceState,
    public_ip_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceState {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeLoadBalancers {
    #[serde(default)]
    load_balancers: Vec<Elbv2LoadBalancer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Elbv2LoadBalancer {
    #[serde(rename = "DNSName")]
    dns_name: String,
    state: LoadBalancerState,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerState {
    code: String,
}
