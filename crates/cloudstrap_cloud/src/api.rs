//! Cloud control-plane boundary.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::CloudResult;

/// Identity the configured credentials resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// Current state of a compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub instance_id: String,
    pub state: String,
    pub public_ip: Option<String>,
}

/// Current state of a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerDescription {
    pub dns_name: String,
    pub state: String,
}

/// Trait abstracting the cloud provider's describe calls.
///
/// Every call is a single query against an eventually consistent control
/// plane; a stale answer is not an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Resolve the active credentials. Fails with
    /// [`crate::CloudError::Credentials`] when none are usable.
    async fn caller_identity(&self) -> CloudResult<CallerIdentity>;

    async fn describe_instance(&self, instance_id: &str) -> CloudResult<InstanceDescription>;

    /// Look up a load balancer by DNS name. `Ok(None)` when no load balancer
    /// with that name is visible yet.
    async fn describe_load_balancer(
        &self,
        dns_name: &str,
    ) -> CloudResult<Option<LoadBalancerDescription>>;
}
