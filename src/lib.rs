//! rackspace-bootstrap library
//!
//! Boots a Rackspace cloud server with a generated cloud-config and
//! optionally enrolls it into RackConnect and Puppet.
//!
//! A run goes through four steps, strictly in order:
//!
//! 1. [`config`] builds the configuration record from options and files
//! 2. [`userdata`] renders the first-boot cloud-config
//! 3. [`catalog`] resolves flavor, image and networks
//! 4. [`provision`] creates the server and waits for it to be usable

pub mod catalog;
pub mod config;
pub mod provider;
pub mod provision;
pub mod userdata;

mod error;

pub use error::BootstrapError;

use config::Credentials;
use provider::rackspace::RackspaceProvider;
use provision::{PollPolicy, Provisioner, ServerReport};
use tracing::info;

/// Settings that control how a run talks to the provider
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Identity endpoint used to authenticate
    pub identity_url: String,
    pub running: PollPolicy,
    pub automation: PollPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            identity_url: provider::rackspace::DEFAULT_IDENTITY_URL.to_string(),
            running: PollPolicy::running(),
            automation: PollPolicy::automation(),
        }
    }
}

/// Provision one server against Rackspace with an already built configuration
pub async fn run(
    credentials: &Credentials,
    config: &config::BootstrapConfig,
    settings: &RunSettings,
) -> Result<ServerReport, BootstrapError> {
    info!("Bootstrapping {} in {}", config.fqdn(), config.region);

    let provider =
        RackspaceProvider::connect_with_identity(&settings.identity_url, credentials, config.region)
            .await?;

    Provisioner::new(&provider)
        .with_running_policy(settings.running)
        .with_automation_policy(settings.automation)
        .provision(config)
        .await
}
