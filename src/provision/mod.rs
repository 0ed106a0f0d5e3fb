//! Server provisioning
//!
//! Drives one server from creation to a final report:
//!
//! `Created -> Running -> [AutomationPending -> AutomationDeployed | AutomationFailed] -> Detailed`
//!
//! The automation states are only visited when RackConnect was requested.
//! Nothing is rolled back on failure; a server that was created stays up.

pub mod wait;

pub use wait::{AUTOMATION_STATUS_KEY, AutomationStatus, PollPolicy, wait_for_automation, wait_until_running};

use crate::BootstrapError;
use crate::catalog::{CatalogResolver, Selection};
use crate::config::BootstrapConfig;
use crate::provider::{ComputeProvider, CreateServerRequest, Server};
use std::fmt;
use tracing::{info, warn};

/// Provisioning progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    /// Create request accepted
    Created,
    /// Provider reports the server ACTIVE
    Running,
    /// Waiting for RackConnect to finish network automation
    AutomationPending,
    AutomationDeployed,
    AutomationFailed,
    /// Final details fetched
    Detailed,
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionState::Created => write!(f, "created"),
            ProvisionState::Running => write!(f, "running"),
            ProvisionState::AutomationPending => write!(f, "automation-pending"),
            ProvisionState::AutomationDeployed => write!(f, "automation-deployed"),
            ProvisionState::AutomationFailed => write!(f, "automation-failed"),
            ProvisionState::Detailed => write!(f, "detailed"),
        }
    }
}

/// What gets printed once the server is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub name: String,
    pub id: String,
    pub access_ip: Option<String>,
    pub private_ips: Vec<String>,
    /// Final RackConnect status, when automation was awaited
    pub automation: Option<AutomationStatus>,
}

impl ServerReport {
    fn new(server: Server, automation: Option<AutomationStatus>) -> Self {
        Self {
            name: server.name,
            id: server.id,
            access_ip: server.access_ipv4,
            private_ips: server.private_ips,
            automation,
        }
    }
}

impl fmt::Display for ServerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} is running and ready", self.name)?;
        writeln!(f, "UUID: {}", self.id)?;
        writeln!(f, "Public IP: {}", self.access_ip.as_deref().unwrap_or(""))?;
        write!(f, "Private IPs: {}", self.private_ips.join(" "))?;
        if let Some(automation) = &self.automation {
            write!(f, "\nRackConnect automation: {}", automation)?;
        }
        Ok(())
    }
}

/// Creates a server and waits for it to become usable
pub struct Provisioner<'a> {
    provider: &'a dyn ComputeProvider,
    running: PollPolicy,
    automation: PollPolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self {
            provider,
            running: PollPolicy::running(),
            automation: PollPolicy::automation(),
        }
    }

    pub fn with_running_policy(mut self, policy: PollPolicy) -> Self {
        self.running = policy;
        self
    }

    pub fn with_automation_policy(mut self, policy: PollPolicy) -> Self {
        self.automation = policy;
        self
    }

    /// Resolve the catalog, then launch
    pub async fn provision(&self, config: &BootstrapConfig) -> Result<ServerReport, BootstrapError> {
        let selection = CatalogResolver::new(self.provider).resolve(config).await?;
        self.launch(config, &selection).await
    }

    /// Create the server from an already resolved selection
    pub async fn launch(
        &self,
        config: &BootstrapConfig,
        selection: &Selection,
    ) -> Result<ServerReport, BootstrapError> {
        info!("Instantiating a new server");
        let request = CreateServerRequest {
            name: config.hostname.clone(),
            image_id: selection.image.id.clone(),
            flavor_id: selection.size.id.clone(),
            user_data: config.user_data.clone(),
            personality: config.personality.clone(),
            metadata: config.metadata.clone(),
            network_ids: selection.network_ids(),
        };
        let created = self.provider.create_server(&request).await?;
        self.transition(ProvisionState::Created, &created.id);

        info!("Waiting for the new server to come online");
        wait_until_running(self.provider, &created.id, self.running).await?;
        self.transition(ProvisionState::Running, &created.id);

        let automation = if config.rackconnect {
            self.transition(ProvisionState::AutomationPending, &created.id);
            info!("Waiting for RackConnect automation to complete");
            let status = wait_for_automation(self.provider, &created.id, self.automation).await?;
            match status {
                AutomationStatus::Failed => {
                    warn!("RackConnect automation failed for server {}", created.id);
                    self.transition(ProvisionState::AutomationFailed, &created.id);
                }
                _ => self.transition(ProvisionState::AutomationDeployed, &created.id),
            }
            Some(status)
        } else {
            None
        };

        info!("Getting the details of the new server");
        let details = self.provider.get_server(&created.id).await?;
        self.transition(ProvisionState::Detailed, &created.id);

        Ok(ServerReport::new(details, automation))
    }

    fn transition(&self, state: ProvisionState, id: &str) {
        info!(server = id, state = %state, "Server state changed");
    }
}
