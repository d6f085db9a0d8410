//! Scripted cloud API for multi-attempt polling tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{CallerIdentity, CloudApi, InstanceDescription, LoadBalancerDescription};
use crate::error::{CloudError, CloudResult};

/// One scripted answer to a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    State(String),
    /// The resource is not visible (yet).
    Missing,
    /// The call itself fails.
    Error(String),
}

impl From<&str> for Scripted {
    fn from(state: &str) -> Self {
        Self::State(state.to_string())
    }
}

#[derive(Default)]
struct Scripts {
    instance: VecDeque<Scripted>,
    load_balancer: VecDeque<Scripted>,
    public_ip: Option<String>,
    denied: Option<String>,
    instance_polls: usize,
    load_balancer_polls: usize,
    identity_checks: usize,
}

/// Cloud API answering describe calls from per-resource scripts.
///
/// The n-th describe call of a resource returns the n-th scripted answer;
/// once a script runs out its last answer repeats. Empty scripts answer
/// `running` and `active`.
#[derive(Clone, Default)]
pub struct ScriptedCloudApi {
    scripts: Arc<Mutex<Scripts>>,
}

impl ScriptedCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scripted>,
    {
        self.scripts
            .lock()
            .instance
            .extend(states.into_iter().map(Into::into));
        self
    }

    pub fn load_balancer_states<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scripted>,
    {
        self.scripts
            .lock()
            .load_balancer
            .extend(states.into_iter().map(Into::into));
        self
    }

    pub fn public_ip(self, ip: impl Into<String>) -> Self {
        self.scripts.lock().public_ip = Some(ip.into());
        self
    }

    /// Make `caller_identity` fail with a credentials error.
    pub fn deny_credentials(self, message: impl Into<String>) -> Self {
        self.scripts.lock().denied = Some(message.into());
        self
    }

    pub fn instance_polls(&self) -> usize {
        self.scripts.lock().instance_polls
    }

    pub fn load_balancer_polls(&self) -> usize {
        self.scripts.lock().load_balancer_polls
    }

    pub fn identity_checks(&self) -> usize {
        self.scripts.lock().identity_checks
    }

    fn next(queue: &mut VecDeque<Scripted>, default: &str) -> Scripted {
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Scripted::Missing)
        } else {
            queue.front().cloned().unwrap_or_else(|| default.into())
        }
    }
}

#[async_trait]
impl CloudApi for ScriptedCloudApi {
    async fn caller_identity(&self) -> CloudResult<CallerIdentity> {
        let mut scripts = self.scripts.lock();
        scripts.identity_checks += 1;
        match &scripts.denied {
            Some(message) => Err(CloudError::Credentials(message.clone())),
            None => Ok(CallerIdentity {
                account: "123456789012".to_string(),
                arn: "arn:aws:iam::123456789012:user/cloudstrap".to_string(),
                user_id: "AIDASCRIPTED".to_string(),
            }),
        }
    }

    async fn describe_instance(&self, instance_id: &str) -> CloudResult<InstanceDescription> {
        let mut scripts = self.scripts.lock();
        scripts.instance_polls += 1;
        match Self::next(&mut scripts.instance, "running") {
            Scripted::State(state) => Ok(InstanceDescription {
                instance_id: instance_id.to_string(),
                public_ip: scripts.public_ip.clone(),
                state,
            }),
            Scripted::Missing => Err(CloudError::NotFound {
                kind: "instance",
                id: instance_id.to_string(),
            }),
            Scripted::Error(message) => Err(CloudError::Api(message)),
        }
    }

    async fn describe_load_balancer(
        &self,
        dns_name: &str,
    ) -> CloudResult<Option<LoadBalancerDescription>> {
        let mut scripts = self.scripts.lock();
        scripts.load_balancer_polls += 1;
        match Self::next(&mut scripts.load_balancer, "active") {
            Scripted::State(state) => Ok(Some(LoadBalancerDescription {
                dns_name: dns_name.to_string(),
                state,
            })),
            Scripted::Missing => Ok(None),
            Scripted::Error(message) => Err(CloudError::Api(message)),
        }
    }
}
