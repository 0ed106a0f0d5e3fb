//! Bootstrap configuration
//!
//! The configuration record is assembled once from command-line options,
//! environment credentials and local files, and is read-only afterwards.

pub mod credentials;
pub mod loader;

pub use credentials::Credentials;
pub use loader::{BootstrapOptions, HOSTS_TEMPLATE, HOSTS_TEMPLATE_TARGET, build_config};

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key carrying the RackConnect load balancer pool
pub const LOAD_BALANCER_POOL_KEY: &str = "RackConnectLBPool";

/// Rackspace region hosting the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Region {
    #[default]
    Ord,
    Iad,
    Dfw,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Ord => "ord",
            Region::Iad => "iad",
            Region::Dfw => "dfw",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary and secondary resolvers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nameservers {
    pub primary: String,
    pub secondary: String,
}

impl Nameservers {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        vec![self.primary.clone(), self.secondary.clone()]
    }
}

/// Fully resolved settings for one bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Short host name (no dots)
    pub hostname: String,
    /// Everything after the first dot; empty for a bare name
    pub domain: String,
    pub region: Region,
    /// Image id; the catalog default applies when absent
    pub image: Option<String>,
    /// Flavor id; the catalog default applies when absent
    pub flavor: Option<String>,
    /// Extra private network id
    pub lan: Option<String>,
    /// Wait for RackConnect automation after boot
    pub rackconnect: bool,
    pub load_balancer_pool: Option<String>,
    pub puppet_host: Option<String>,
    pub puppet_ip: Option<String>,
    pub nameservers: Option<Nameservers>,
    pub ssh_keys: Option<Vec<String>>,
    /// Rendered cloud-config
    pub user_data: String,
    /// Files injected at creation, keyed by target path
    pub personality: BTreeMap<String, String>,
    /// Server metadata tags
    pub metadata: BTreeMap<String, String>,
}

impl BootstrapConfig {
    /// Reassemble the name the server was requested as
    pub fn fqdn(&self) -> String {
        if self.domain.is_empty() {
            self.hostname.clone()
        } else {
            format!("{}.{}", self.hostname, self.domain)
        }
    }
}

/// Split `host.example.com` into `("host", "example.com")`
pub fn split_hostname(fqdn: &str) -> (String, String) {
    match fqdn.split_once('.') {
        Some((host, domain)) => (host.to_string(), domain.to_string()),
        None => (fqdn.to_string(), String::new()),
    }
}

/// Keep the part of an identifier before the first `:`, trimmed
///
/// Lets users paste `id: description` pairs straight from listings.
pub fn truncate_identifier(raw: &str) -> String {
    raw.split(':').next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multi_label_name() {
        let (host, domain) = split_hostname("h.d1.d2");
        assert_eq!(host, "h");
        assert_eq!(domain, "d1.d2");
    }

    #[test]
    fn test_split_bare_name() {
        let (host, domain) = split_hostname("standalone");
        assert_eq!(host, "standalone");
        assert_eq!(domain, "");
    }

    #[test]
    fn test_truncate_identifier() {
        assert_eq!(truncate_identifier("pool-a:web tier"), "pool-a");
        assert_eq!(truncate_identifier("  abc-123  : extra : more"), "abc-123");
        assert_eq!(truncate_identifier(" plain "), "plain");
        assert_eq!(truncate_identifier(":nothing"), "");
    }

    #[test]
    fn test_region_default_and_display() {
        assert_eq!(Region::default(), Region::Ord);
        assert_eq!(Region::Iad.to_string(), "iad");
        assert_eq!(Region::from_str("dfw", true).unwrap(), Region::Dfw);
    }
}
