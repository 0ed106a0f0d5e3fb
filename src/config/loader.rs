//! Configuration builder
//!
//! Merges command-line options with the authorized keys file and the
//! bundled hosts template into a [`BootstrapConfig`].

use super::{
    BootstrapConfig, LOAD_BALANCER_POOL_KEY, Nameservers, Region, split_hostname,
    truncate_identifier,
};
use crate::{BootstrapError, userdata};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Hosts template shipped with the tool
pub const HOSTS_TEMPLATE: &str = include_str!("../../templates/ubuntu-hosts.tmpl");

/// Where cloud-init on Ubuntu looks for the hosts template
pub const HOSTS_TEMPLATE_TARGET: &str = "/etc/cloud/templates/hosts.debian.tmpl";

/// Raw user input, before files are read and defaults applied
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Fully qualified name of the new server
    pub fqdn: String,
    pub region: Option<Region>,
    pub image: Option<String>,
    pub flavor: Option<String>,
    pub rackconnect: bool,
    pub load_balancer: Option<String>,
    pub private_lan: Option<String>,
    pub ssh_authorized_keys: Option<PathBuf>,
    pub puppet_host: Option<String>,
    pub puppet_ip: Option<String>,
    pub nameservers: Option<Nameservers>,
}

/// Build the configuration record for one run
pub async fn build_config(options: &BootstrapOptions) -> Result<BootstrapConfig, BootstrapError> {
    let ssh_keys = match &options.ssh_authorized_keys {
        Some(path) => Some(read_authorized_keys(path).await?),
        None => None,
    };

    let (hostname, domain) = split_hostname(&options.fqdn);
    if hostname.is_empty() {
        return Err(BootstrapError::Config(format!(
            "invalid hostname '{}'",
            options.fqdn
        )));
    }

    let user_data = userdata::render_user_data(
        &hostname,
        &domain,
        ssh_keys.as_deref(),
        options.nameservers.as_ref(),
        options.puppet_host.as_deref(),
    )?;

    let mut personality = BTreeMap::new();
    if let Some(ip) = &options.puppet_ip {
        let host = options.puppet_host.as_deref().ok_or_else(|| {
            BootstrapError::Config("--puppet-ip requires --puppet-host".to_string())
        })?;
        personality.insert(
            HOSTS_TEMPLATE_TARGET.to_string(),
            hosts_with_entry(HOSTS_TEMPLATE, ip, host),
        );
    }

    let load_balancer_pool = options.load_balancer.as_deref().map(truncate_identifier);
    let mut metadata = BTreeMap::new();
    if let Some(pool) = &load_balancer_pool {
        metadata.insert(LOAD_BALANCER_POOL_KEY.to_string(), pool.clone());
    }

    let config = BootstrapConfig {
        hostname,
        domain,
        region: options.region.unwrap_or_default(),
        image: options.image.as_deref().map(truncate_identifier),
        flavor: options.flavor.as_deref().map(truncate_identifier),
        lan: options.private_lan.as_deref().map(truncate_identifier),
        rackconnect: options.rackconnect,
        load_balancer_pool,
        puppet_host: options.puppet_host.clone(),
        puppet_ip: options.puppet_ip.clone(),
        nameservers: options.nameservers.clone(),
        ssh_keys,
        user_data,
        personality,
        metadata,
    };
    debug!(
        "Built configuration for {} in {}",
        config.fqdn(),
        config.region
    );
    Ok(config)
}

/// Read an authorized_keys file, one trimmed entry per line
async fn read_authorized_keys(path: &Path) -> Result<Vec<String>, BootstrapError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| BootstrapError::file_read(path, e))?;

    let keys: Vec<String> = content.lines().map(|line| line.trim().to_string()).collect();
    debug!("Read {} authorized keys from {}", keys.len(), path.display());
    Ok(keys)
}

/// Append a `<ip> <host>` line to a hosts template
fn hosts_with_entry(template: &str, ip: &str, host: &str) -> String {
    format!("{}\n{} {}\n", template, ip, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(fqdn: &str) -> BootstrapOptions {
        BootstrapOptions {
            fqdn: fqdn.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_minimal_options() {
        let config = build_config(&options("web1.example.com")).await.unwrap();

        assert_eq!(config.hostname, "web1");
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.region, Region::Ord);
        assert!(config.ssh_keys.is_none());
        assert!(config.personality.is_empty());
        assert!(config.metadata.is_empty());
        assert!(config.image.is_none());
        assert!(config.flavor.is_none());
        assert!(config.lan.is_none());
        assert!(!config.rackconnect);
    }

    #[tokio::test]
    async fn test_fqdn_round_trips() {
        let config = build_config(&options("h.d1.d2")).await.unwrap();
        assert_eq!(config.fqdn(), "h.d1.d2");

        let config = build_config(&options("bare")).await.unwrap();
        assert_eq!(config.domain, "");
        assert_eq!(config.fqdn(), "bare");
    }

    #[tokio::test]
    async fn test_identifiers_are_truncated() {
        let opts = BootstrapOptions {
            image: Some("img-1 : Ubuntu".to_string()),
            flavor: Some("performance1-2:2GB".to_string()),
            private_lan: Some(" lan-9 :backend".to_string()),
            load_balancer: Some("web-pool : public".to_string()),
            ..options("web1.example.com")
        };
        let config = build_config(&opts).await.unwrap();

        assert_eq!(config.image.as_deref(), Some("img-1"));
        assert_eq!(config.flavor.as_deref(), Some("performance1-2"));
        assert_eq!(config.lan.as_deref(), Some("lan-9"));
        assert_eq!(config.load_balancer_pool.as_deref(), Some("web-pool"));
        assert_eq!(
            config.metadata.get(LOAD_BALANCER_POOL_KEY).map(String::as_str),
            Some("web-pool")
        );
    }

    #[tokio::test]
    async fn test_reads_and_trims_authorized_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("authorized_keys");
        fs::write(&path, "  ssh-rsa AAAA one@host  \nssh-ed25519 BBBB two@host\n")
            .await
            .unwrap();

        let opts = BootstrapOptions {
            ssh_authorized_keys: Some(path),
            ..options("web1.example.com")
        };
        let config = build_config(&opts).await.unwrap();

        assert_eq!(
            config.ssh_keys,
            Some(vec![
                "ssh-rsa AAAA one@host".to_string(),
                "ssh-ed25519 BBBB two@host".to_string()
            ])
        );
        assert!(config.user_data.contains("ssh-ed25519 BBBB two@host"));
    }

    #[tokio::test]
    async fn test_unreadable_keys_file() {
        let opts = BootstrapOptions {
            ssh_authorized_keys: Some(PathBuf::from("/nonexistent/authorized_keys")),
            ..options("web1.example.com")
        };
        let err = build_config(&opts).await.unwrap_err();
        assert!(matches!(err, BootstrapError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_puppet_ip_injects_hosts_template() {
        let opts = BootstrapOptions {
            rackconnect: true,
            puppet_host: Some("pm.x".to_string()),
            puppet_ip: Some("10.0.0.5".to_string()),
            ..options("web1.example.com")
        };
        let config = build_config(&opts).await.unwrap();

        assert_eq!(config.personality.len(), 1);
        let hosts = &config.personality[HOSTS_TEMPLATE_TARGET];
        assert!(hosts.starts_with(HOSTS_TEMPLATE));
        assert!(hosts.ends_with("\n10.0.0.5 pm.x\n"));
    }

    #[tokio::test]
    async fn test_puppet_ip_without_host_is_rejected() {
        let opts = BootstrapOptions {
            puppet_ip: Some("10.0.0.5".to_string()),
            ..options("web1.example.com")
        };
        let err = build_config(&opts).await.unwrap_err();
        assert!(matches!(err, BootstrapError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_hostname_is_rejected() {
        let err = build_config(&options(".example.com")).await.unwrap_err();
        assert!(matches!(err, BootstrapError::Config(_)));
    }
}
