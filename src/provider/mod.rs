//! Compute provider clients
//!
//! A provider exposes the catalog (flavors, images, networks) and the
//! handful of server calls needed to boot and inspect one instance.

pub mod mock;
pub mod rackspace;

use crate::BootstrapError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Machine size (flavor) offered by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Size {
    pub id: String,
    pub name: String,
    /// Memory in MB
    pub ram: u64,
}

/// Bootable machine image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub name: String,
}

/// Attachable network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub label: String,
}

/// Provider-reported server state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Build,
    Active,
    Error,
    Other(String),
}

impl ServerStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_uppercase().as_str() {
            "BUILD" => Self::Build,
            "ACTIVE" => Self::Active,
            "ERROR" => Self::Error,
            _ => Self::Other(status.to_string()),
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Build => write!(f, "BUILD"),
            ServerStatus::Active => write!(f, "ACTIVE"),
            ServerStatus::Error => write!(f, "ERROR"),
            ServerStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Server as last reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: ServerStatus,
    pub access_ipv4: Option<String>,
    pub public_ips: Vec<String>,
    pub private_ips: Vec<String>,
}

/// Everything needed to create a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServerRequest {
    pub name: String,
    pub image_id: String,
    pub flavor_id: String,
    /// Cloud-config text, delivered through the config drive
    pub user_data: String,
    /// Files to inject, keyed by target path
    pub personality: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
    pub network_ids: Vec<String>,
}

/// Trait for compute APIs capable of booting a server
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Name of this provider (e.g., "Rackspace")
    fn name(&self) -> &'static str;

    /// List available flavors
    async fn list_sizes(&self) -> Result<Vec<Size>, BootstrapError>;

    /// List available images
    async fn list_images(&self) -> Result<Vec<Image>, BootstrapError>;

    /// List networks visible to the account
    async fn list_networks(&self) -> Result<Vec<Network>, BootstrapError>;

    /// Create a server; returns as soon as the provider accepts the request
    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, BootstrapError>;

    /// Fetch current details of a server
    async fn get_server(&self, id: &str) -> Result<Server, BootstrapError>;

    /// Fetch the metadata map of a server
    async fn get_metadata(&self, id: &str) -> Result<BTreeMap<String, String>, BootstrapError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(ServerStatus::parse("ACTIVE"), ServerStatus::Active);
        assert_eq!(ServerStatus::parse("build"), ServerStatus::Build);
        assert_eq!(ServerStatus::parse("ERROR"), ServerStatus::Error);
        assert_eq!(
            ServerStatus::parse("HARD_REBOOT"),
            ServerStatus::Other("HARD_REBOOT".to_string())
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ServerStatus::Active.to_string(), "ACTIVE");
        assert_eq!(ServerStatus::Other("RESIZE".into()).to_string(), "RESIZE");
    }
}
