//! Bounded polling of resource states.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::CloudApi;
use crate::report::ValidationReport;

/// Timestamp format of `validation_timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A resource whose state is validated after provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Instance { id: String },
    LoadBalancer { dns_name: String },
}

impl ResourceRef {
    pub fn instance(id: impl Into<String>) -> Self {
        Self::Instance { id: id.into() }
    }

    pub fn load_balancer(dns_name: impl Into<String>) -> Self {
        Self::LoadBalancer {
            dns_name: dns_name.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Instance { .. } => "EC2 instance",
            Self::LoadBalancer { .. } => "load balancer",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Instance { id } => id,
            Self::LoadBalancer { dns_name } => dns_name,
        }
    }

    /// The terminal state the resource is expected to reach.
    pub fn expected_state(&self) -> &'static str {
        match self {
            Self::Instance { .. } => "running",
            Self::LoadBalancer { .. } => "active",
        }
    }

    /// States from which the expected state can no longer be reached.
    fn is_dead_end(&self, state: &str) -> bool {
        match self {
            Self::Instance { .. } => {
                matches!(state, "shutting-down" | "terminated" | "stopping" | "stopped")
            }
            Self::LoadBalancer { .. } => state == "failed",
        }
    }
}

/// Retry budget for [`ResourceValidator::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    max_attempts: u32,
    interval: Duration,
}

impl PollSettings {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(12, Duration::from_secs(10))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Pending,
    Reached,
    DeadEnd,
}

#[derive(Debug)]
struct Tracked<'a> {
    resource: &'a ResourceRef,
    state: Option<String>,
    public_ip: Option<String>,
    progress: Progress,
}

/// Polls the cloud API until every resource reached its terminal state or
/// the attempt budget is spent.
pub struct ResourceValidator {
    api: Arc<dyn CloudApi>,
}

impl ResourceValidator {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    /// Poll `resources` and assemble a report.
    ///
    /// Each resource is tracked on its own: once it reached its terminal
    /// state (or a dead end) it is no longer queried, while the others keep
    /// being polled. A failed describe call counts as "not yet". The last
    /// observed state of every resource ends up in the report.
    ///
    /// Cancelling `cancel` stops polling before the next attempt; the report
    /// is then marked `interrupted` and never `complete`. An empty resource
    /// list is never `complete` either.
    pub async fn poll(
        &self,
        resources: &[ResourceRef],
        settings: &PollSettings,
        cancel: &CancellationToken,
    ) -> ValidationReport {
        let mut tracked: Vec<Tracked<'_>> = resources
            .iter()
            .map(|resource| Tracked {
                resource,
                state: None,
                public_ip: None,
                progress: Progress::Pending,
            })
            .collect();

        let mut attempts = 0;
        let mut interrupted = false;

        while attempts < settings.max_attempts {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            attempts += 1;

            for entry in tracked.iter_mut().filter(|t| t.progress == Progress::Pending) {
                self.observe(entry, attempts, settings.max_attempts).await;
            }

            if tracked.iter().all(|t| t.progress != Progress::Pending) {
                break;
            }

            if attempts < settings.max_attempts {
                debug!("Waiting {:?} before next validation attempt", settings.interval);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(settings.interval) => {}
                }
            }
        }

        if interrupted {
            warn!("Validation interrupted after {} attempts", attempts);
        }
        build_report(&tracked, attempts, interrupted)
    }

    async fn observe(&self, entry: &mut Tracked<'_>, attempt: u32, max_attempts: u32) {
        let resource = entry.resource;
        let observed = match resource {
            ResourceRef::Instance { id } => self
                .api
                .describe_instance(id)
                .await
                .map(|d| Some((d.state, d.public_ip))),
            ResourceRef::LoadBalancer { dns_name } => self
                .api
                .describe_load_balancer(dns_name)
                .await
                .map(|d| d.map(|lb| (lb.state, None))),
        };

        match observed {
            Ok(Some((state, public_ip))) => {
                info!(
                    "{} {} is in state: {} (attempt {}/{})",
                    resource.kind(),
                    resource.id(),
                    state,
                    attempt,
                    max_attempts
                );
                if state == resource.expected_state() {
                    entry.progress = Progress::Reached;
                } else if resource.is_dead_end(&state) {
                    warn!(
                        "{} {} is {} and will not become {}",
                        resource.kind(),
                        resource.id(),
                        state,
                        resource.expected_state()
                    );
                    entry.progress = Progress::DeadEnd;
                }
                entry.state = Some(state);
                if public_ip.is_some() {
                    entry.public_ip = public_ip;
                }
            }
            Ok(None) => {
                debug!("{} {} not visible yet", resource.kind(), resource.id());
            }
            Err(e) => {
                warn!("Describing {} {} failed: {}", resource.kind(), resource.id(), e);
            }
        }
    }
}

fn build_report(tracked: &[Tracked<'_>], attempts: u32, interrupted: bool) -> ValidationReport {
    let mut report = ValidationReport {
        instance_id: None,
        instance_state: None,
        public_ip: None,
        load_balancer_dns: None,
        load_balancer_state: None,
        validation_timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        // Nothing to check proves nothing.
        complete: !interrupted
            && !tracked.is_empty()
            && tracked.iter().all(|t| t.progress == Progress::Reached),
        attempts,
        interrupted,
        unreachable: Vec::new(),
    };

    for entry in tracked {
        match entry.resource {
            ResourceRef::Instance { id } => {
                report.instance_id = Some(id.clone());
                report.instance_state = entry.state.clone();
                report.public_ip = entry.public_ip.clone();
            }
            ResourceRef::LoadBalancer { dns_name } => {
                report.load_balancer_dns = Some(dns_name.clone());
                report.load_balancer_state = entry.state.clone();
            }
        }
        if entry.progress == Progress::DeadEnd {
            report.unreachable.push(entry.resource.id().to_string());
        }
    }

    report
}
