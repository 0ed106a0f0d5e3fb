//! Bounded polling for server readiness and RackConnect automation

use crate::BootstrapError;
use crate::provider::{ComputeProvider, Server, ServerStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Metadata key RackConnect updates while wiring up a server
pub const AUTOMATION_STATUS_KEY: &str = "rackconnect_automation_status";

/// How often and how many times to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Enough attempts at `interval` to cover `timeout`, at least one
    pub fn from_timeout(interval: Duration, timeout: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            timeout.as_millis().div_ceil(interval.as_millis())
        };
        Self::new(interval, u32::try_from(attempts).unwrap_or(u32::MAX).max(1))
    }

    /// Server readiness: every 3 seconds for up to 10 minutes
    pub fn running() -> Self {
        Self::from_timeout(Duration::from_secs(3), Duration::from_secs(600))
    }

    /// RackConnect automation: every 5 seconds for up to 30 minutes
    pub fn automation() -> Self {
        Self::from_timeout(Duration::from_secs(5), Duration::from_secs(1800))
    }
}

/// Value of the RackConnect automation status key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationStatus {
    Deploying,
    Deployed,
    Failed,
    Other(String),
}

impl AutomationStatus {
    /// Read the status from server metadata; an absent key means still deploying
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Self {
        match metadata.get(AUTOMATION_STATUS_KEY).map(String::as_str) {
            None | Some("DEPLOYING") => Self::Deploying,
            Some("DEPLOYED") => Self::Deployed,
            // RackConnect reports failure in mixed case
            Some("Failed") => Self::Failed,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deployed | Self::Failed)
    }
}

impl fmt::Display for AutomationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationStatus::Deploying => write!(f, "DEPLOYING"),
            AutomationStatus::Deployed => write!(f, "DEPLOYED"),
            AutomationStatus::Failed => write!(f, "Failed"),
            AutomationStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Poll until the server is ACTIVE
///
/// An ERROR status ends the wait immediately. Provider errors are not
/// retried here.
pub async fn wait_until_running(
    provider: &dyn ComputeProvider,
    id: &str,
    policy: PollPolicy,
) -> Result<Server, BootstrapError> {
    for attempt in 1..=policy.max_attempts {
        let server = provider.get_server(id).await?;
        debug!(
            "Server {} status {} (attempt {}/{})",
            id, server.status, attempt, policy.max_attempts
        );

        match server.status {
            ServerStatus::Active => return Ok(server),
            ServerStatus::Error => return Err(BootstrapError::InstanceFailed(id.to_string())),
            _ => {}
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(BootstrapError::Timeout(format!(
        "server {} to become ACTIVE",
        id
    )))
}

/// Poll the automation status until RackConnect reports DEPLOYED or Failed
///
/// Read errors are logged and counted as another pending attempt.
pub async fn wait_for_automation(
    provider: &dyn ComputeProvider,
    id: &str,
    policy: PollPolicy,
) -> Result<AutomationStatus, BootstrapError> {
    for attempt in 1..=policy.max_attempts {
        let status = match provider.get_metadata(id).await {
            Ok(metadata) => AutomationStatus::from_metadata(&metadata),
            Err(e) => {
                warn!("Reading automation status of {} failed: {}", id, e);
                AutomationStatus::Deploying
            }
        };
        debug!(
            "RackConnect automation {} (attempt {}/{})",
            status, attempt, policy.max_attempts
        );

        if status.is_terminal() {
            return Ok(status);
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(BootstrapError::Timeout(format!(
        "RackConnect automation on server {}",
        id
    )))
}
